// src/services/extract.rs

//! Course page extraction.
//!
//! Turns raw portal HTML into a [`CourseSnapshot`] and parses the course
//! list page used for discovery.

use regex::Regex;
use scraper::{ElementRef, Html, Node, Selector};

use crate::error::{AppError, Result};
use crate::models::{Course, CourseId, CourseSnapshot, ExtractConfig, FileEntry};
use crate::services::portal::CoursePage;
use crate::utils::{normalize_whitespace, resolve};

/// Category used when a file block carries no `(...)` label.
pub const DEFAULT_CATEGORY: &str = "other";

/// Converts a fetched course page into structured course data.
pub trait CourseExtractor: Send + Sync {
    fn extract(&self, course: &Course, page: &CoursePage) -> Result<CourseSnapshot>;
}

/// Selector-driven extractor for portal course pages.
pub struct HtmlExtractor {
    description: Selector,
    file: Selector,
    file_name: Selector,
    file_link: Selector,
    page_marker: Selector,
    leading_index: Regex,
    category: Regex,
}

impl HtmlExtractor {
    pub fn new(config: &ExtractConfig) -> Result<Self> {
        Ok(Self {
            description: parse_selector(&config.description_selector)?,
            file: parse_selector(&config.file_selector)?,
            file_name: parse_selector(&config.file_name_selector)?,
            file_link: parse_selector(&config.file_link_selector)?,
            page_marker: parse_selector(&config.page_marker_selector)?,
            leading_index: Regex::new(r"^\d+\s*-\s*")?,
            category: Regex::new(r"\((.+?)\)")?,
        })
    }

    fn parse_files(&self, document: &Html, page_url: &str) -> Vec<FileEntry> {
        let mut files = Vec::new();

        for block in document.select(&self.file) {
            let Some(name_elem) = block.select(&self.file_name).next() else {
                continue;
            };

            let raw_name = normalize_whitespace(&name_elem.text().collect::<Vec<_>>().join(" "));
            let name = self.leading_index.replace(&raw_name, "").trim().to_string();
            if name.is_empty() {
                continue;
            }

            let block_text = normalize_whitespace(&block.text().collect::<Vec<_>>().join(" "));
            let category = self
                .category
                .captures_iter(&block_text)
                .last()
                .and_then(|caps| caps.get(1))
                .map(|m| m.as_str().trim().to_string())
                .filter(|c| !c.is_empty())
                .unwrap_or_else(|| DEFAULT_CATEGORY.to_string());

            let link = block
                .select(&self.file_link)
                .next()
                .and_then(|a| a.value().attr("href"))
                .map(|href| resolve(page_url, href).unwrap_or_else(|| href.to_string()))
                .unwrap_or_default();

            files.push(FileEntry {
                id: format!("{name}|{category}|{link}"),
                display_name: name,
                category,
            });
        }

        files
    }
}

impl CourseExtractor for HtmlExtractor {
    fn extract(&self, course: &Course, page: &CoursePage) -> Result<CourseSnapshot> {
        let document = Html::parse_document(&page.html);

        if document.select(&self.page_marker).next().is_none() {
            return Err(AppError::extraction(
                course.code.as_str(),
                "page does not contain course content (login page or layout change?)",
            ));
        }

        let description = document
            .select(&self.description)
            .next()
            .map(description_text)
            .unwrap_or_default();

        Ok(CourseSnapshot {
            course_id: course.code.clone(),
            course_name: course.name.clone(),
            description,
            files: self.parse_files(&document, &page.url),
        })
    }
}

/// Render a description element as plain text, one block per line.
///
/// Tables collapse to a `[TABLE]` line, list items get a bullet, and
/// blank lines are dropped.
pub fn description_text(element: ElementRef<'_>) -> String {
    let mut raw = String::new();
    push_children(element, &mut raw);

    raw.lines()
        .map(normalize_whitespace)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

fn push_children(element: ElementRef<'_>, out: &mut String) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => out.push_str(text),
            Node::Element(_) => {
                if let Some(child) = ElementRef::wrap(child) {
                    push_element(child, out);
                }
            }
            _ => {}
        }
    }
}

fn push_element(element: ElementRef<'_>, out: &mut String) {
    match element.value().name() {
        "table" => out.push_str("\n[TABLE]\n"),
        "br" => out.push('\n'),
        "p" | "div" | "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => {
            out.push('\n');
            push_children(element, out);
            out.push('\n');
        }
        "li" => {
            out.push_str("\n• ");
            push_children(element, out);
        }
        "script" | "style" => {}
        _ => push_children(element, out),
    }
}

/// Parse the portal's course list table.
///
/// Rows look like `| .. | (|CODE|) Course Name (45) | .. | 45 | 63 |`;
/// rows whose ids are not numeric are skipped.
pub fn parse_course_list(html: &str) -> Result<Vec<Course>> {
    let document = Html::parse_document(html);
    let table_sel = parse_selector("table")?;
    let row_sel = parse_selector("tr")?;
    let cell_sel = parse_selector("td")?;

    let code_re = Regex::new(r"\(\|(.+?)\|\)")?;
    let code_prefix_re = Regex::new(r"\(\|.+?\|\)\s*")?;
    let trailing_number_re = Regex::new(r"\s*\(\d+\)$")?;

    let table = document
        .select(&table_sel)
        .next()
        .ok_or_else(|| AppError::discovery("no course table found on the course list page"))?;

    let mut courses = Vec::new();
    for row in table.select(&row_sel) {
        let cells: Vec<String> = row
            .select(&cell_sel)
            .map(|td| normalize_whitespace(&td.text().collect::<Vec<_>>().join(" ")))
            .collect();
        if cells.len() < 5 {
            continue;
        }

        let (Ok(id), Ok(season_id)) = (cells[3].parse::<u32>(), cells[4].parse::<u32>()) else {
            log::debug!("Skipping course row with non-numeric ids: {:?}", cells);
            continue;
        };

        let title = &cells[1];
        let (code, name) = match code_re.captures(title).and_then(|c| c.get(1)) {
            Some(code) => {
                let name = code_prefix_re.replace(title, "");
                let name = trailing_number_re.replace(name.trim(), "");
                (code.as_str().trim().to_string(), name.trim().to_string())
            }
            None => (title.clone(), title.clone()),
        };

        courses.push(Course {
            code: CourseId::new(code),
            name,
            id,
            season_id,
        });
    }

    Ok(courses)
}

fn parse_selector(s: &str) -> Result<Selector> {
    Selector::parse(s).map_err(|e| AppError::selector(s, format!("{e:?}")))
}
