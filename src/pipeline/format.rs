// src/pipeline/format.rs

//! Notification formatting.

use crate::models::{ChangeEvent, Notification};

pub const FILES_CATEGORY: &str = "cms-files";
pub const DESCRIPTION_CATEGORY: &str = "cms-description";

/// Human-readable notification title for an event.
pub fn title(event: &ChangeEvent) -> String {
    match event {
        ChangeEvent::NewFile {
            course_id,
            course_name,
            file,
        } => format!(
            "({course_id}) {course_name} - New file just dropped - {} ({})",
            file.display_name, file.category
        ),
        ChangeEvent::DescriptionChanged {
            course_id,
            course_name,
            new_description,
        } => format!("({course_id}) {course_name} - Description changed - {new_description}"),
    }
}

/// Full notification for an event: title, body and category tag.
pub fn notification(event: &ChangeEvent) -> Notification {
    let (body, category) = match event {
        ChangeEvent::NewFile { file, .. } => (
            format!("{} ({})", file.display_name, file.category),
            FILES_CATEGORY,
        ),
        ChangeEvent::DescriptionChanged {
            new_description, ..
        } => (new_description.clone(), DESCRIPTION_CATEGORY),
    };

    Notification {
        title: title(event),
        body,
        category: category.to_string(),
    }
}
