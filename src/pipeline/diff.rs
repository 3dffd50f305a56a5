// src/pipeline/diff.rs

//! Change detection between a fresh snapshot and the stored versions.
//!
//! Evaluation order is fixed: a description change (if any) comes first,
//! followed by new files in page order. Delivery and commit follow this
//! order, so it also decides notification order.

use std::collections::{BTreeSet, HashSet};

use crate::models::{ChangeEvent, CourseSnapshot};

/// Last-known state of one course, as loaded from the version store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PriorState {
    pub description: Option<String>,
    pub file_ids: BTreeSet<String>,
}

impl PriorState {
    /// Apply a committed event, mirroring what the store records.
    pub fn absorb(&mut self, event: &ChangeEvent) {
        match event {
            ChangeEvent::DescriptionChanged {
                new_description, ..
            } => self.description = Some(new_description.clone()),
            ChangeEvent::NewFile { file, .. } => {
                self.file_ids.insert(file.id.clone());
            }
        }
    }
}

/// Compare `snapshot` against `prior` and list the changes to notify.
pub fn detect_changes(snapshot: &CourseSnapshot, prior: &PriorState) -> Vec<ChangeEvent> {
    let mut events = Vec::new();

    // An empty description means "no data", never "changed to empty".
    if !snapshot.description.is_empty()
        && prior.description.as_deref() != Some(snapshot.description.as_str())
    {
        events.push(ChangeEvent::DescriptionChanged {
            course_id: snapshot.course_id.clone(),
            course_name: snapshot.course_name.clone(),
            new_description: snapshot.description.clone(),
        });
    }

    let mut seen = HashSet::new();
    for file in &snapshot.files {
        if prior.file_ids.contains(&file.id) || !seen.insert(file.id.as_str()) {
            continue;
        }
        events.push(ChangeEvent::NewFile {
            course_id: snapshot.course_id.clone(),
            course_name: snapshot.course_name.clone(),
            file: file.clone(),
        });
    }

    events
}
