diesel::table! {
    users (id) {
        id -> Int4,
        email -> Varchar,
        password -> Varchar,
        role_id -> Int4,
        last_login -> Nullable<Timestamptz>,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
        deleted_at -> Nullable<Timestamptz>,
    }
}

diesel::table! {
    user_profiles (id) {
        id -> Int4,
        user_id -> Int4,
        first_name -> Varchar,
        last_name -> Varchar,
        phone -> Varchar,
        avatar -> Varchar,
        birthday -> Varchar,
        department -> Varchar,
        gender -> Varchar,
        company_joined_date -> Varchar,
        introduction -> Text,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
        deleted_at -> Nullable<Timestamptz>,
    }
}

diesel::table! {
    courses (id) {
        id -> Int4,
        title -> Varchar,
        description -> Text,
        category -> Varchar,
        thumbnail -> Varchar,
        duration -> Int4,
        created_by -> Int4,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
        deleted_at -> Nullable<Timestamptz>,
    }
}

diesel::table! {
    modules (id) {
        id -> Int4,
        course_id -> Int4,
        title -> Varchar,
        position -> Int4,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
        deleted_at -> Nullable<Timestamptz>,
    }
}

diesel::table! {
    module_items (id) {
        id -> Int4,
        module_id -> Int4,
        title -> Varchar,
        item_type -> Varchar,
        resource -> Varchar,
        position -> Int4,
        required_time -> Int4,
        quiz_id -> Int4,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
        deleted_at -> Nullable<Timestamptz>,
    }
}

diesel::table! {
    quizzes (id) {
        id -> Int4,
        title -> Varchar,
        difficulty -> Int4,
        total_score -> Float8,
        time_limit -> Int4,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
        deleted_at -> Nullable<Timestamptz>,
    }
}

diesel::table! {
    quiz_questions (id) {
        id -> Int4,
        quiz_id -> Int4,
        question_type -> Varchar,
        question_text -> Text,
        explanation -> Text,
        weight -> Float8,
        is_multiple_correct -> Bool,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
        deleted_at -> Nullable<Timestamptz>,
    }
}

diesel::table! {
    quiz_answers (id) {
        id -> Int4,
        question_id -> Int4,
        answer_text -> Text,
        is_correct -> Bool,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
        deleted_at -> Nullable<Timestamptz>,
    }
}

diesel::table! {
    quiz_submissions (id) {
        id -> Int4,
        user_id -> Int4,
        quiz_id -> Int4,
        question_id -> Int4,
        selected_answer_ids -> Array<Int4>,
        answer_text -> Text,
        score -> Float8,
        attempt -> Int4,
        reviewed -> Bool,
        feedback -> Text,
        submitted_at -> Timestamptz,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
        deleted_at -> Nullable<Timestamptz>,
    }
}

diesel::table! {
    user_progresses (id) {
        id -> Int4,
        user_id -> Int4,
        course_id -> Int4,
        course_position -> Int4,
        module_position -> Int4,
        module_item_position -> Int4,
        completed -> Bool,
        performance -> Nullable<Int4>,
        review_comment -> Nullable<Text>,
        reviewed_by -> Nullable<Int4>,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
        deleted_at -> Nullable<Timestamptz>,
    }
}

diesel::table! {
    template_paths (id) {
        id -> Int4,
        name -> Varchar,
        description -> Text,
        course_ids -> Array<Int4>,
        duration -> Int4,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
        deleted_at -> Nullable<Timestamptz>,
    }
}

diesel::table! {
    skill_keywords (id) {
        id -> Int4,
        name -> Varchar,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
        deleted_at -> Nullable<Timestamptz>,
    }
}

diesel::table! {
    course_skill_keywords (id) {
        id -> Int4,
        course_id -> Int4,
        skill_keyword_id -> Int4,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
        deleted_at -> Nullable<Timestamptz>,
    }
}

diesel::table! {
    user_courses (id) {
        id -> Int4,
        user_id -> Int4,
        course_id -> Int4,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
        deleted_at -> Nullable<Timestamptz>,
    }
}

diesel::table! {
    app_feedbacks (id) {
        id -> Int4,
        user_id -> Int4,
        rating -> Int4,
        comment -> Text,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
        deleted_at -> Nullable<Timestamptz>,
    }
}

diesel::allow_tables_to_appear_in_same_query!(
    users,
    user_profiles,
    courses,
    modules,
    module_items,
    quizzes,
    quiz_questions,
    quiz_answers,
    quiz_submissions,
    user_progresses,
    template_paths,
    skill_keywords,
    course_skill_keywords,
    user_courses,
    app_feedbacks,
);
