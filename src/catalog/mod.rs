//! Course catalog: courses, their ordered modules and module items, and
//! the skill-keyword tags.

pub mod courses;
pub mod items;
pub mod keywords;
pub mod modules;
