use serde::{Deserialize, Serialize};

/// One of the three editor panes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceField {
    Html,
    Css,
    Js,
}

/// The HTML, CSS and JavaScript text currently in the editor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceBundle {
    pub html: String,
    pub css: String,
    pub js: String,
}

impl SourceBundle {
    pub fn new(html: impl Into<String>, css: impl Into<String>, js: impl Into<String>) -> Self {
        Self {
            html: html.into(),
            css: css.into(),
            js: js.into(),
        }
    }

    pub fn get(&self, field: SourceField) -> &str {
        match field {
            SourceField::Html => &self.html,
            SourceField::Css => &self.css,
            SourceField::Js => &self.js,
        }
    }

    /// Replace one pane. Returns `false` when the text is unchanged.
    pub fn set(&mut self, field: SourceField, text: impl Into<String>) -> bool {
        let text = text.into();
        let slot = match field {
            SourceField::Html => &mut self.html,
            SourceField::Css => &mut self.css,
            SourceField::Js => &mut self.js,
        };
        if *slot == text {
            return false;
        }
        *slot = text;
        true
    }

    /// Combined size of all panes in bytes.
    pub fn len(&self) -> usize {
        self.html.len() + self.css.len() + self.js.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
