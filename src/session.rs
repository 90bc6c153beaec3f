//! Event-driven curation session.
//!
//! One [`Session`] owns the master table and the transient UI state. Each
//! [`AppEvent`] runs to completion; afterwards the display view is
//! recomputed from the committed master table, so every later event sees
//! the latest state.

use crate::catalog::{CategoryMapping, FieldCatalog};
use crate::classify::{classify, ClassifierRules};
use crate::edit::{reconcile_edit, EditEvent};
use crate::error_display::{user_message_from_fetch, user_message_from_report};
use crate::export::{export_path, export_view, ExportOptions};
use crate::fetch::{is_known_accession, is_valid_project_id, MetadataFetcher};
use crate::filter::{derive_display_view, filter_choices, DisplayView, FilterRules, FilterSpec};
use crate::inject::inject_fields;
use crate::normalize::{normalize, NormalizeRules};
use crate::table::MetadataTable;
use crate::AppConfig;
use std::path::PathBuf;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq)]
pub enum AppEvent {
    Fetch { project_id: String, detailed: bool },
    AddColumn(String),
    RemoveColumns(Vec<String>),
    /// Inject fields for a category; `None` uses the suggested category.
    InjectFields(Option<String>),
    SetColumnFilter(String, Vec<String>),
    ClearColumnFilter(String),
    SetThresholdFilter(bool),
    ClearFilters,
    EditCell(EditEvent),
    /// Export the display view; `None` uses the configured directory.
    Export { directory: Option<PathBuf> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// Transient status message shown after an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub level: NotificationLevel,
    pub message: String,
}

impl Notification {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Info,
            message: message.into(),
        }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Success,
            message: message.into(),
        }
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Warning,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NotificationLevel::Error,
            message: message.into(),
        }
    }
}

/// Fixed rules and tables a session works with.
#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub normalize: NormalizeRules,
    pub classifier: ClassifierRules,
    pub filter: FilterRules,
    pub export: ExportOptions,
    pub mapping: CategoryMapping,
    pub catalog: FieldCatalog,
}

impl SessionSettings {
    pub fn from_config(
        config: &AppConfig,
        mapping: CategoryMapping,
        catalog: FieldCatalog,
    ) -> Self {
        Self {
            normalize: config.curation.normalize_rules(),
            classifier: config.curation.classifier_rules(),
            filter: config.filter.rules(),
            export: config.export.options(),
            mapping,
            catalog,
        }
    }
}

pub struct Session {
    fetcher: Box<dyn MetadataFetcher>,
    settings: SessionSettings,
    project_id: Option<String>,
    master: MetadataTable,
    suggested_category: Option<String>,
    filters: FilterSpec,
    view: DisplayView,
}

impl Session {
    pub fn new(fetcher: Box<dyn MetadataFetcher>, settings: SessionSettings) -> Self {
        Self {
            fetcher,
            settings,
            project_id: None,
            master: MetadataTable::new(),
            suggested_category: None,
            filters: FilterSpec::new(),
            view: DisplayView::default(),
        }
    }

    pub fn master(&self) -> &MetadataTable {
        &self.master
    }

    pub fn view(&self) -> &DisplayView {
        &self.view
    }

    pub fn filters(&self) -> &FilterSpec {
        &self.filters
    }

    pub fn project_id(&self) -> Option<&str> {
        self.project_id.as_deref()
    }

    pub fn suggested_category(&self) -> Option<&str> {
        self.suggested_category.as_deref()
    }

    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    /// Choices a multi-select filter on `column` would offer.
    pub fn filter_choices(&self, column: &str) -> Vec<String> {
        filter_choices(&self.master, column, &self.settings.filter)
    }

    /// Handle one event. Returns the status message to show, if any.
    pub fn event(&mut self, event: AppEvent) -> Option<Notification> {
        let notification = match event {
            AppEvent::Fetch {
                project_id,
                detailed,
            } => self.fetch(&project_id, detailed),
            AppEvent::AddColumn(name) => self.add_column(&name),
            AppEvent::RemoveColumns(names) => self.remove_columns(&names),
            AppEvent::InjectFields(category) => self.inject(category),
            AppEvent::SetColumnFilter(column, values) => {
                self.filters.set_column(&column, values);
                None
            }
            AppEvent::ClearColumnFilter(column) => {
                self.filters.clear_column(&column);
                None
            }
            AppEvent::SetThresholdFilter(enabled) => {
                self.filters.numeric_threshold = enabled;
                None
            }
            AppEvent::ClearFilters => {
                self.filters.clear();
                None
            }
            AppEvent::EditCell(edit) => self.edit(edit),
            AppEvent::Export { directory } => self.export(directory),
        };
        self.refresh_view();
        notification
    }

    fn refresh_view(&mut self) {
        self.view = derive_display_view(&self.master, &self.filters, &self.settings.filter);
    }

    fn fetch(&mut self, project_id: &str, detailed: bool) -> Option<Notification> {
        let project_id = project_id.trim();
        if project_id.is_empty() {
            return None;
        }
        if !is_valid_project_id(project_id) {
            warn!(project = project_id, "rejected project identifier");
            return Some(Notification::error(format!(
                "Invalid project id \"{}\". Use letters, digits, '_', '-' or '.'",
                project_id
            )));
        }
        if !is_known_accession(project_id) {
            warn!(project = project_id, "identifier does not look like a project accession");
        }

        let raw = match self.fetcher.fetch(project_id, detailed) {
            Ok(raw) => raw,
            Err(e) => {
                warn!(project = project_id, error = %e, "fetch failed; keeping current data");
                return Some(Notification::error(user_message_from_fetch(&e)));
            }
        };

        let (table, report) = normalize(&raw, &self.settings.normalize);
        let category = classify(&table, &self.settings.mapping, &self.settings.classifier);
        info!(
            project = project_id,
            rows = table.row_count(),
            columns = table.columns().len(),
            category = %category,
            "loaded project metadata"
        );

        self.master = table;
        self.project_id = Some(project_id.to_string());
        self.suggested_category = Some(category.clone());
        self.filters = FilterSpec::new();

        if report.has_duplicates() {
            let renamed: Vec<String> = report
                .renamed
                .iter()
                .map(|(from, to)| format!("{} -> {}", from, to))
                .collect();
            return Some(Notification::warning(format!(
                "Fetched {} runs for {}. Suggested category: {}. Duplicate columns renamed: {}",
                self.master.row_count(),
                project_id,
                category,
                renamed.join(", ")
            )));
        }
        Some(Notification::success(format!(
            "Fetched {} runs for {}. Suggested category: {}",
            self.master.row_count(),
            project_id,
            category
        )))
    }

    fn add_column(&mut self, name: &str) -> Option<Notification> {
        let name = name.trim();
        if name.is_empty() {
            return None;
        }
        if self.master.has_column(name) {
            return Some(Notification::warning(format!(
                "Column \"{}\" already exists",
                name
            )));
        }
        self.master.add_column(name);
        debug!(column = name, "added column");
        Some(Notification::info(format!("Added column \"{}\"", name)))
    }

    fn remove_columns(&mut self, names: &[String]) -> Option<Notification> {
        let removed = self.master.remove_columns(names);
        if removed == 0 {
            return None;
        }
        self.filters.retain_columns(&self.master);
        debug!(removed, "removed columns");
        Some(Notification::info(format!("Removed {} column(s)", removed)))
    }

    fn inject(&mut self, category: Option<String>) -> Option<Notification> {
        self.project_id.as_ref()?;
        let category = category
            .filter(|c| !c.trim().is_empty())
            .or_else(|| self.suggested_category.clone())
            .unwrap_or_else(|| self.settings.classifier.default_label.clone());
        let added = inject_fields(
            &mut self.master,
            &category,
            &self.settings.catalog,
            &self.settings.classifier.separator,
        );
        if added.is_empty() {
            Some(Notification::info(format!(
                "No new fields for \"{}\"",
                category
            )))
        } else {
            Some(Notification::info(format!(
                "Added {} field(s) for \"{}\": {}",
                added.len(),
                category,
                added.join(", ")
            )))
        }
    }

    fn edit(&mut self, edit: EditEvent) -> Option<Notification> {
        if self.master.is_empty() {
            return None;
        }
        match reconcile_edit(&mut self.master, &self.view, edit) {
            Ok(_) => None,
            Err(e) => {
                warn!(error = %e, "edit rejected");
                Some(Notification::warning(format!("Edit ignored: {}", e)))
            }
        }
    }

    fn export(&mut self, directory: Option<PathBuf>) -> Option<Notification> {
        let project_id = self.project_id.clone()?;
        if self.master.is_empty() {
            return None;
        }
        let mut options = self.settings.export.clone();
        if let Some(dir) = directory {
            options.directory = dir;
        }
        match export_view(&self.master, &self.view, &project_id, &options) {
            Ok(Some(path)) => Some(Notification::success(format!(
                "Saved {} rows to {}",
                self.view.row_count(),
                path.display()
            ))),
            Ok(None) => None,
            Err(e) => {
                let path = export_path(&project_id, &options);
                Some(Notification::error(user_message_from_report(
                    &e,
                    Some(&path),
                )))
            }
        }
    }
}
