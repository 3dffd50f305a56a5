// src/services/portal.rs

//! Course portal access.
//!
//! Discovers the current course list and retrieves raw course pages.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};

use crate::config::Credentials;
use crate::error::{AppError, Result};
use crate::models::{Course, PortalConfig};
use crate::services::extract::parse_course_list;
use crate::utils::http;

/// Raw course page as fetched from the portal.
#[derive(Debug, Clone)]
pub struct CoursePage {
    /// Final URL of the page, used to resolve relative links
    pub url: String,
    pub html: String,
}

/// Source of course lists and course pages.
#[async_trait]
pub trait CoursePortal: Send + Sync {
    /// Current list of courses to monitor.
    async fn discover_courses(&self) -> Result<Vec<Course>>;

    /// Raw page for one course.
    async fn fetch_course_page(&self, course: &Course) -> Result<CoursePage>;
}

/// Portal reached over HTTP, optionally with basic auth.
pub struct HttpPortal {
    config: PortalConfig,
    client: Client,
    credentials: Option<Credentials>,
}

impl HttpPortal {
    pub fn new(config: &PortalConfig, credentials: Option<Credentials>) -> Result<Self> {
        let client = http::create_async_client(
            &config.user_agent,
            std::time::Duration::from_secs(config.timeout_secs),
        )?;
        Ok(Self {
            config: config.clone(),
            client,
            credentials,
        })
    }

    /// GET a page, mapping every failure to a fetch error for `context`.
    async fn get(&self, context: &str, url: &str) -> Result<CoursePage> {
        let mut request = self.client.get(url);
        if let Some(creds) = &self.credentials {
            request = request.basic_auth(&creds.username, Some(&creds.password));
        }

        let response = request
            .send()
            .await
            .map_err(|e| AppError::fetch(context, e))?;

        if response.status() == StatusCode::UNAUTHORIZED {
            return Err(AppError::fetch(context, "authentication failed (401)"));
        }

        let response = response
            .error_for_status()
            .map_err(|e| AppError::fetch(context, e))?;
        let final_url = response.url().to_string();
        let html = response
            .text()
            .await
            .map_err(|e| AppError::fetch(context, e))?;

        Ok(CoursePage {
            url: final_url,
            html,
        })
    }
}

#[async_trait]
impl CoursePortal for HttpPortal {
    async fn discover_courses(&self) -> Result<Vec<Course>> {
        log::debug!("Fetching course list from {}", self.config.course_list_url);
        let page = self
            .get("course list", &self.config.course_list_url)
            .await
            .map_err(AppError::discovery)?;
        parse_course_list(&page.html)
    }

    async fn fetch_course_page(&self, course: &Course) -> Result<CoursePage> {
        let url = course.page_url(&self.config.course_page_url);
        log::debug!("Fetching {} from {}", course.label(), url);
        self.get(course.code.as_str(), &url).await
    }
}
