use serde::{Deserialize, Serialize};

/// Identity of the application whose top-level windows are tracked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetApp {
    /// Matched as a substring of the `ps` command name on Unix, and exactly
    /// against the executable stem on Windows.
    pub process_name: String,
    /// Native window class; only consulted on Windows.
    #[serde(default)]
    pub window_class: Option<String>,
    /// Title suffix used when the owning process cannot be resolved.
    #[serde(default)]
    pub title_suffix: Option<String>,
}

impl TargetApp {
    pub fn new(process_name: impl Into<String>) -> Self {
        Self {
            process_name: process_name.into(),
            window_class: None,
            title_suffix: None,
        }
    }

    pub fn with_window_class(mut self, class: impl Into<String>) -> Self {
        self.window_class = Some(class.into());
        self
    }

    pub fn with_title_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.title_suffix = Some(suffix.into());
        self
    }

    /// Check an executable name (bare name, path, or `name.exe`) against the target.
    pub fn matches_process(&self, name: &str) -> bool {
        if self.process_name.is_empty() {
            return false;
        }
        let base = name
            .rsplit(|c: char| c == '/' || c == '\\')
            .next()
            .unwrap_or(name)
            .trim();
        base.contains(self.process_name.as_str())
    }

    /// Exact, case-insensitive check of an executable name with its
    /// extension already stripped ("sublime_text" for "sublime_text.exe").
    pub fn matches_exe_stem(&self, stem: &str) -> bool {
        !self.process_name.is_empty() && stem.eq_ignore_ascii_case(&self.process_name)
    }

    pub fn matches_class(&self, class: &str) -> bool {
        match &self.window_class {
            Some(expected) => expected == class,
            None => true,
        }
    }

    pub fn matches_title(&self, title: &str) -> bool {
        match &self.title_suffix {
            Some(suffix) => !suffix.is_empty() && title.ends_with(suffix.as_str()),
            None => false,
        }
    }
}

impl Default for TargetApp {
    /// Sublime Text.
    fn default() -> Self {
        Self::new("sublime_text")
            .with_window_class("PX_WINDOW_CLASS")
            .with_title_suffix(" - Sublime Text")
    }
}
