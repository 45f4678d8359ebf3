// 🖼️ Presenter - reconciled registry → static status page
//
// No decisions here beyond ordering and formatting. Rendering runs after the
// state has been saved, so a failure is reported and nothing is rolled back.

use crate::error::RenderError;
use crate::organization::{OrganizationRecord, RegistryState, UpdateOutcome};
use crate::temporal::display_utc;
use std::fs;
use std::path::PathBuf;
use tracing::{info, warn};

pub const STATUS_TOKEN: &str = "{{STATUS_HTML}}";
pub const CARDS_TOKEN: &str = "{{COMPANY_CARDS}}";

const EMPTY_CARDS_HTML: &str =
    "<p>No company data to display. The scraper might need an update.</p>";

pub struct Presenter {
    template_file: PathBuf,
    output_file: PathBuf,
}

impl Presenter {
    pub fn new<T: Into<PathBuf>, O: Into<PathBuf>>(template_file: T, output_file: O) -> Self {
        Presenter {
            template_file: template_file.into(),
            output_file: output_file.into(),
        }
    }

    /// Read the template, substitute, write the page. Returns the output path.
    pub fn render(&self, state: &RegistryState) -> Result<PathBuf, RenderError> {
        if !self.template_file.is_file() {
            return Err(RenderError::TemplateMissing(self.template_file.clone()));
        }

        let template = fs::read_to_string(&self.template_file).map_err(|source| RenderError::Io {
            path: self.template_file.clone(),
            source,
        })?;

        let page = render_document(&template, state);

        if let Some(parent) = self.output_file.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|source| RenderError::Io {
                    path: parent.to_path_buf(),
                    source,
                })?;
            }
        }

        fs::write(&self.output_file, page).map_err(|source| RenderError::Io {
            path: self.output_file.clone(),
            source,
        })?;

        info!("Rendered {}", self.output_file.display());
        Ok(self.output_file.clone())
    }
}

// ============================================================================
// PURE RENDERING
// ============================================================================

/// Substitute both fragments into `template`
pub fn render_document(template: &str, state: &RegistryState) -> String {
    for token in [STATUS_TOKEN, CARDS_TOKEN] {
        if !template.contains(token) {
            warn!("Template has no {} placeholder; that fragment is dropped", token);
        }
    }

    template
        .replace(STATUS_TOKEN, &status_html(state))
        .replace(CARDS_TOKEN, &cards_html(state))
}

/// Records in display order: name (case-sensitive, byte order), then identifier
pub fn sorted_records(state: &RegistryState) -> Vec<&OrganizationRecord> {
    let mut records: Vec<&OrganizationRecord> = state.records.values().collect();
    records.sort_by(|a, b| {
        a.name
            .cmp(&b.name)
            .then_with(|| a.identifier.cmp(&b.identifier))
    });
    records
}

/// Freshness banner; a never-updated registry counts as stale
pub fn status_html(state: &RegistryState) -> String {
    let (class, text) = match state.last_update_outcome {
        Some(UpdateOutcome::Success) => ("fresh", "Fresh"),
        Some(UpdateOutcome::Stale) | None => ("stale", "Stale"),
    };

    let updated = state
        .last_update_time
        .as_ref()
        .map(display_utc)
        .unwrap_or_else(|| "Never".to_string());

    format!(
        r#"<span class="status-indicator {class}">●</span> {text} (Last updated: {updated})"#
    )
}

pub fn cards_html(state: &RegistryState) -> String {
    let records = sorted_records(state);
    if records.is_empty() {
        return EMPTY_CARDS_HTML.to_string();
    }

    let mut html = String::new();
    for record in records {
        let name = if record.name.is_empty() {
            "No Name"
        } else {
            record.name.as_str()
        };
        let url = escape_html(&record.identifier);

        html.push_str(&format!(
            r#"
            <div class="card">
                <h3>{name}</h3>
                <p><span class="status-indicator {dot}">●</span> {label}</p>
                <a href="{url}" target="_blank">{url}</a>
            </div>
            "#,
            name = escape_html(name),
            dot = record.status.as_str(),
            label = record.status.label(),
            url = url,
        ));
    }
    html
}

pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

// ============================================================================
// TESTS
// ============================================================================
