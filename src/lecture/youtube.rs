//! Client for the YouTube Data API. Only the handful of fields the
//! lecture assembler displays are deserialized.

use serde::Deserialize;

pub const YOUTUBE_API_BASE: &str = "https://www.googleapis.com/youtube/v3";

/// What the assembler shows for a video item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoMetadata {
    pub title: String,
    pub thumbnail: String,
    /// `HH:MM:SS` when the video runs an hour or longer, else `MM:SS`.
    pub duration: String,
    /// `YYYY/MM/DD`.
    pub published_at: String,
}

#[derive(Debug, Deserialize)]
struct VideoListResponse {
    #[serde(default)]
    items: Vec<VideoItem>,
}

#[derive(Debug, Deserialize)]
struct VideoItem {
    snippet: Snippet,
    #[serde(rename = "contentDetails")]
    content_details: ContentDetails,
}

#[derive(Debug, Deserialize)]
struct Snippet {
    title: String,
    #[serde(rename = "publishedAt")]
    published_at: String,
    thumbnails: Thumbnails,
}

#[derive(Debug, Deserialize)]
struct Thumbnails {
    default: Thumbnail,
}

#[derive(Debug, Deserialize)]
struct Thumbnail {
    url: String,
}

#[derive(Debug, Deserialize)]
struct ContentDetails {
    duration: String,
}

pub struct YoutubeClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl YoutubeClient {
    pub fn new(http: reqwest::Client, api_key: String) -> Self {
        Self::with_base_url(http, YOUTUBE_API_BASE.to_string(), api_key)
    }

    pub fn with_base_url(http: reqwest::Client, base_url: String, api_key: String) -> Self {
        Self {
            http,
            base_url,
            api_key,
        }
    }

    pub async fn video_metadata(&self, video_id: &str) -> anyhow::Result<VideoMetadata> {
        let url = format!("{}/videos", self.base_url);
        let response: VideoListResponse = self
            .http
            .get(&url)
            .query(&[
                ("id", video_id),
                ("part", "snippet,contentDetails"),
                ("key", &self.api_key),
            ])
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let item = response
            .items
            .into_iter()
            .next()
            .ok_or_else(|| anyhow::anyhow!("no metadata for video {video_id}"))?;

        Ok(VideoMetadata {
            title: item.snippet.title,
            thumbnail: item.snippet.thumbnails.default.url,
            duration: format_duration(&item.content_details.duration),
            published_at: format_publish_date(&item.snippet.published_at),
        })
    }
}

/// Normalises an ISO-8601 duration (`PT1H2M3S`) to a clock string.
pub fn format_duration(iso: &str) -> String {
    let mut hours = 0u64;
    let mut minutes = 0u64;
    let mut seconds = 0u64;
    let mut value = 0u64;
    let mut in_time = false;

    for c in iso.chars() {
        match c {
            'T' => in_time = true,
            '0'..='9' => value = value * 10 + (c as u64 - '0' as u64),
            'H' if in_time => {
                hours = value;
                value = 0;
            }
            'M' if in_time => {
                minutes = value;
                value = 0;
            }
            'S' if in_time => {
                seconds = value;
                value = 0;
            }
            _ => value = 0,
        }
    }

    if hours > 0 {
        format!("{hours:02}:{minutes:02}:{seconds:02}")
    } else {
        format!("{minutes:02}:{seconds:02}")
    }
}

/// `2023-04-05T06:07:08Z` becomes `2023/04/05`.
pub fn format_publish_date(published_at: &str) -> String {
    let date = published_at.split('T').next().unwrap_or(published_at);
    date.replace('-', "/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration("PT1H2M3S"), "01:02:03");
        assert_eq!(format_duration("PT4M20S"), "04:20");
        assert_eq!(format_duration("PT45S"), "00:45");
        assert_eq!(format_duration("PT2H"), "02:00:00");
    }

    #[test]
    fn test_format_publish_date() {
        assert_eq!(format_publish_date("2023-04-05T06:07:08Z"), "2023/04/05");
    }

    #[tokio::test]
    async fn test_video_metadata_parses_response() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/videos")
            .match_query(mockito::Matcher::AllOf(vec![
                mockito::Matcher::UrlEncoded("id".into(), "abc123".into()),
                mockito::Matcher::UrlEncoded("key".into(), "test-key".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{
                    "items": [{
                        "snippet": {
                            "title": "Workplace Safety 101",
                            "publishedAt": "2023-04-05T06:07:08Z",
                            "thumbnails": {"default": {"url": "https://img.example/abc.jpg"}}
                        },
                        "contentDetails": {"duration": "PT12M34S"}
                    }]
                }"#,
            )
            .create_async()
            .await;

        let client = YoutubeClient::with_base_url(
            reqwest::Client::new(),
            server.url(),
            "test-key".to_string(),
        );
        let metadata = client.video_metadata("abc123").await.unwrap();

        mock.assert_async().await;
        assert_eq!(metadata.title, "Workplace Safety 101");
        assert_eq!(metadata.thumbnail, "https://img.example/abc.jpg");
        assert_eq!(metadata.duration, "12:34");
        assert_eq!(metadata.published_at, "2023/04/05");
    }

    #[tokio::test]
    async fn test_video_metadata_empty_items_is_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/videos")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"items": []}"#)
            .create_async()
            .await;

        let client = YoutubeClient::with_base_url(
            reqwest::Client::new(),
            server.url(),
            "test-key".to_string(),
        );
        assert!(client.video_metadata("missing").await.is_err());
    }
}
