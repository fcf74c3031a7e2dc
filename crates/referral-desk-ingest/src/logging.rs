// SPDX-License-Identifier: Apache-2.0

use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportStage {
    Headers,
    Parse,
    Persist,
    Finalize,
}

impl ImportStage {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Headers => "headers",
            Self::Parse => "parse",
            Self::Persist => "persist",
            Self::Finalize => "finalize",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ImportEvent {
    pub stage: ImportStage,
    pub name: String,
    pub fields: BTreeMap<String, String>,
}

/// Stage events of one import run; each event is also mirrored to `tracing`.
#[derive(Debug, Default, Clone)]
pub struct ImportLog {
    events: Vec<ImportEvent>,
}

impl ImportLog {
    pub fn emit(
        &mut self,
        stage: ImportStage,
        name: impl Into<String>,
        fields: BTreeMap<String, String>,
    ) {
        let name = name.into();
        tracing::info!(stage = stage.as_str(), event = %name, fields = ?fields, "import event");
        self.events.push(ImportEvent {
            stage,
            name,
            fields,
        });
    }

    #[must_use]
    pub fn events(&self) -> &[ImportEvent] {
        &self.events
    }

    #[must_use]
    pub fn into_events(self) -> Vec<ImportEvent> {
        self.events
    }
}

pub(crate) fn fields<const N: usize>(pairs: [(&str, String); N]) -> BTreeMap<String, String> {
    pairs
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect()
}
