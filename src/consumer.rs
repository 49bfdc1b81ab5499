//! Per-screen view over the shared repository.
//!
//! A consumer never patches its own copy of the tree. Every mutation is
//! followed by a full reload so all open screens converge on the same view.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::categories::CategoryRepository;
use crate::model::CategoryTree;
use crate::AppError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(tag = "kind", rename_all = "snake_case")]
#[ts(export, export_to = "bindings/")]
pub enum CategoryKind {
    Main,
    Sub {
        #[serde(rename = "parentId", default)]
        parent_id: Option<String>,
    },
}

/// Form input from the product-group screen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryDraft {
    pub name: String,
    #[serde(flatten)]
    pub kind: CategoryKind,
}

impl CategoryDraft {
    pub fn main(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: CategoryKind::Main,
        }
    }

    pub fn sub(name: impl Into<String>, parent_id: Option<String>) -> Self {
        Self {
            name: name.into(),
            kind: CategoryKind::Sub { parent_id },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ConsumerState {
    Idle,
    Loading,
    Ready { tree: CategoryTree },
    Error { error: AppError, tree: CategoryTree },
}

impl ConsumerState {
    /// Tree the renderer may draw; `None` while idle or loading.
    pub fn tree(&self) -> Option<&CategoryTree> {
        match self {
            ConsumerState::Ready { tree } | ConsumerState::Error { tree, .. } => Some(tree),
            ConsumerState::Idle | ConsumerState::Loading => None,
        }
    }

    pub fn error(&self) -> Option<&AppError> {
        match self {
            ConsumerState::Error { error, .. } => Some(error),
            _ => None,
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, ConsumerState::Ready { .. })
    }
}

pub struct CategoryConsumer {
    repo: Arc<CategoryRepository>,
    state: ConsumerState,
}

impl CategoryConsumer {
    pub fn new(repo: Arc<CategoryRepository>) -> Self {
        Self {
            repo,
            state: ConsumerState::Idle,
        }
    }

    pub fn state(&self) -> &ConsumerState {
        &self.state
    }

    /// Screen opened: materialize implicit categories, then load.
    pub async fn open(&mut self) -> &ConsumerState {
        self.state = ConsumerState::Loading;
        self.repo.sync().await;
        self.reload(None).await
    }

    pub async fn create(&mut self, draft: CategoryDraft) -> &ConsumerState {
        self.state = ConsumerState::Loading;
        let parent_id = match &draft.kind {
            CategoryKind::Main => None,
            CategoryKind::Sub { parent_id: None } => {
                let error = AppError::new(
                    "CATEGORY/PARENT_REQUIRED",
                    "Choose a main category for the sub-category",
                );
                return self.reload(Some(error)).await;
            }
            CategoryKind::Sub {
                parent_id: Some(parent),
            } => Some(parent.as_str()),
        };
        let outcome = self.repo.create(&draft.name, parent_id).await;
        self.reload(outcome.err()).await
    }

    pub async fn delete(&mut self, id: &str) -> &ConsumerState {
        self.state = ConsumerState::Loading;
        let outcome = self.repo.delete(id).await;
        self.reload(outcome.err()).await
    }

    async fn reload(&mut self, failure: Option<AppError>) -> &ConsumerState {
        let tree = self.repo.load().await.tree();
        self.state = match failure {
            None => ConsumerState::Ready { tree },
            Some(error) => ConsumerState::Error { error, tree },
        };
        &self.state
    }
}
