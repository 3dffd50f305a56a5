// src/models/change.rs

//! Change events and the notifications built from them.

use serde::{Deserialize, Serialize};

use super::course::{CourseId, FileEntry};

/// A single detected addition or edit that needs one notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChangeEvent {
    NewFile {
        course_id: CourseId,
        course_name: String,
        file: FileEntry,
    },
    DescriptionChanged {
        course_id: CourseId,
        course_name: String,
        new_description: String,
    },
}

impl ChangeEvent {
    pub fn course_id(&self) -> &CourseId {
        match self {
            Self::NewFile { course_id, .. } | Self::DescriptionChanged { course_id, .. } => {
                course_id
            }
        }
    }

    pub fn course_name(&self) -> &str {
        match self {
            Self::NewFile { course_name, .. } | Self::DescriptionChanged { course_name, .. } => {
                course_name
            }
        }
    }
}

/// A formatted notification ready for delivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub title: String,
    pub body: String,
    pub category: String,
}
