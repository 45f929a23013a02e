use std::future::Future;

use log::debug;
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;

use super::{
    error::JournalError,
    models::{
        lesson_model::{
            AttendanceRecord, BulkAttendance, GradeRecord, GradeUpsert, GroupId, GroupRoster,
            LessonId, LessonPatch, Student,
        },
        Config,
    },
};

/// A trait, necessary for every entity that will be used for reading and writing the journal.
pub trait JournalApi: Send + Sync {
    fn group_roster(
        &self,
        group_id: GroupId,
    ) -> impl Future<Output = Result<GroupRoster, JournalError>> + Send;

    fn lesson_attendance(
        &self,
        group_id: GroupId,
        lesson_ids: &[LessonId],
    ) -> impl Future<Output = Result<Vec<AttendanceRecord>, JournalError>> + Send;

    fn save_attendance_bulk(
        &self,
        bulk: &BulkAttendance,
    ) -> impl Future<Output = Result<(), JournalError>> + Send;

    fn lesson_grades(
        &self,
        lesson_ids: &[LessonId],
    ) -> impl Future<Output = Result<Vec<GradeRecord>, JournalError>> + Send;

    fn upsert_grade(
        &self,
        grade: &GradeUpsert,
    ) -> impl Future<Output = Result<(), JournalError>> + Send;

    fn patch_lesson(
        &self,
        patch: &LessonPatch,
    ) -> impl Future<Output = Result<(), JournalError>> + Send;

    fn group_students(
        &self,
        group_id: GroupId,
    ) -> impl Future<Output = Result<Vec<Student>, JournalError>> + Send;
}

/// Journal backend reached over HTTP.
pub struct HttpJournal {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl HttpJournal {
    pub fn new(client: Client, config: &Config) -> Self {
        HttpJournal {
            client,
            base_url: config.api_base_url.trim_end_matches('/').to_owned(),
            token: config.api_token.clone(),
        }
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let request_url = format!("{}{}", self.base_url, path);
        debug!("{} {}", method, request_url);
        let builder = self.client.request(method, request_url);
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn check(response: Response) -> Result<Response, JournalError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let message = response.text().await.unwrap_or_default();
        Err(JournalError::Api {
            status: status.as_u16(),
            message,
        })
    }

    async fn fetch<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T, JournalError> {
        let response = Self::check(builder.send().await?).await?;
        Ok(response.json().await?)
    }

    async fn submit(&self, builder: RequestBuilder) -> Result<(), JournalError> {
        Self::check(builder.send().await?).await?;
        Ok(())
    }
}

fn lesson_ids_query(lesson_ids: &[LessonId]) -> Vec<(&'static str, String)> {
    lesson_ids
        .iter()
        .map(|id| ("lesson_ids", id.to_string()))
        .collect()
}

/// Allows HttpJournal to serve sheets via requests to the journal backend.
impl JournalApi for HttpJournal {
    async fn group_roster(&self, group_id: GroupId) -> Result<GroupRoster, JournalError> {
        self.fetch(self.request(Method::GET, &format!("/groups/{}", group_id)))
            .await
    }

    async fn lesson_attendance(
        &self,
        group_id: GroupId,
        lesson_ids: &[LessonId],
    ) -> Result<Vec<AttendanceRecord>, JournalError> {
        let mut query = vec![("group_id", group_id.to_string())];
        query.extend(lesson_ids_query(lesson_ids));
        self.fetch(
            self.request(Method::GET, "/admin/journal/attendance")
                .query(&query),
        )
        .await
    }

    async fn save_attendance_bulk(&self, bulk: &BulkAttendance) -> Result<(), JournalError> {
        self.submit(
            self.request(Method::POST, "/admin/journal/attendance/bulk")
                .json(bulk),
        )
        .await
    }

    async fn lesson_grades(
        &self,
        lesson_ids: &[LessonId],
    ) -> Result<Vec<GradeRecord>, JournalError> {
        self.fetch(
            self.request(Method::GET, "/admin/journal/grades")
                .query(&lesson_ids_query(lesson_ids)),
        )
        .await
    }

    async fn upsert_grade(&self, grade: &GradeUpsert) -> Result<(), JournalError> {
        self.submit(self.request(Method::POST, "/admin/journal/grades").json(grade))
            .await
    }

    async fn patch_lesson(&self, patch: &LessonPatch) -> Result<(), JournalError> {
        self.submit(
            self.request(
                Method::PATCH,
                &format!("/admin/schedule/lessons/{}", patch.lesson_id),
            )
            .json(patch),
        )
        .await
    }

    async fn group_students(&self, group_id: GroupId) -> Result<Vec<Student>, JournalError> {
        self.fetch(self.request(
            Method::GET,
            &format!("/admin/schedule/groups/{}/students", group_id),
        ))
        .await
    }
}
