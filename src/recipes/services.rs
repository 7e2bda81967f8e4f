use std::sync::Arc;

use futures_util::future::join_all;
use parking_lot::RwLock;
use serde::Serialize;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

use super::client::TextGenerator;
use super::parse::{parse_recipe, Recipe};
use super::prompt::build_prompt;
use crate::error::AppError;
use crate::items::ItemRepo;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SuggestionStatus {
    Idle,
    Pending,
    Ready,
    Failed,
}

/// State of the most recent recipe request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Suggestion {
    #[default]
    Idle,
    Pending,
    Ready {
        raw: String,
        recipe: Recipe,
    },
    Failed {
        error: AppError,
        /// Reply text, kept when the service answered but the answer did not parse.
        raw: Option<String>,
    },
}

impl Suggestion {
    pub fn status(&self) -> SuggestionStatus {
        match self {
            Self::Idle => SuggestionStatus::Idle,
            Self::Pending => SuggestionStatus::Pending,
            Self::Ready { .. } => SuggestionStatus::Ready,
            Self::Failed { .. } => SuggestionStatus::Failed,
        }
    }

    pub fn raw(&self) -> Option<&str> {
        match self {
            Self::Ready { raw, .. } => Some(raw),
            Self::Failed { raw, .. } => raw.as_deref(),
            _ => None,
        }
    }

    pub fn recipe(&self) -> Option<&Recipe> {
        match self {
            Self::Ready { recipe, .. } => Some(recipe),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&AppError> {
        match self {
            Self::Failed { error, .. } => Some(error),
            _ => None,
        }
    }

    fn failed(error: AppError) -> Self {
        Self::Failed { error, raw: None }
    }
}

/// Turns a selection of item IDs into a recipe suggestion.
///
/// Names are read from the record store on every call rather than from any
/// local item list. Overlapping calls are not serialized; the stored state is
/// whatever the last call to finish wrote.
pub struct RecipePipeline {
    items: ItemRepo,
    generator: Arc<dyn TextGenerator>,
    model: String,
    state: RwLock<Suggestion>,
}

impl RecipePipeline {
    pub fn new(
        items: ItemRepo,
        generator: Arc<dyn TextGenerator>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            items,
            generator,
            model: model.into(),
            state: RwLock::new(Suggestion::Idle),
        }
    }

    pub fn current(&self) -> Suggestion {
        self.state.read().clone()
    }

    /// Runs one suggestion request for `selection`.
    ///
    /// An empty selection is rejected up front and leaves the state as it was.
    /// Every other outcome, failures included, becomes the new state and is
    /// returned. Dropping the call while it is pending puts the previous
    /// state back.
    #[instrument(skip(self, selection), fields(selected = selection.len(), model = %self.model))]
    pub async fn suggest(&self, selection: &[Uuid]) -> Result<Suggestion, AppError> {
        if selection.is_empty() {
            warn!("recipe requested with nothing selected");
            return Err(AppError::validation("no items selected"));
        }

        let previous = std::mem::replace(&mut *self.state.write(), Suggestion::Pending);
        let mut pending = PendingGuard {
            state: &self.state,
            previous: Some(previous),
        };

        let outcome = self.run(selection).await;
        pending.previous = None;
        if let Suggestion::Failed { error, .. } = &outcome {
            error!(kind = error.kind(), error = %error, "recipe suggestion failed");
        } else {
            info!("recipe suggestion ready");
        }

        *self.state.write() = outcome.clone();
        Ok(outcome)
    }

    async fn run(&self, selection: &[Uuid]) -> Suggestion {
        let names = match self.resolve_names(selection).await {
            Ok(names) => names,
            Err(e) => return Suggestion::failed(e),
        };

        let prompt = build_prompt(&names);
        let raw = match self.generator.generate(&self.model, &prompt).await {
            Ok(raw) => raw,
            Err(e) => return Suggestion::failed(e),
        };

        match parse_recipe(&raw) {
            Ok(recipe) => Suggestion::Ready { raw, recipe },
            Err(error) => Suggestion::Failed {
                error,
                raw: Some(raw),
            },
        }
    }

    /// Looks every ID up concurrently. Names come back in selection order.
    async fn resolve_names(&self, selection: &[Uuid]) -> Result<Vec<String>, AppError> {
        let lookups = selection.iter().map(|&id| async move {
            match self.items.get(id).await {
                Ok(Some(item)) => Ok(item.name),
                Ok(None) => {
                    warn!(%id, "selected item not found");
                    Err(id)
                }
                Err(e) => {
                    warn!(%id, error = %e, "selected item lookup failed");
                    Err(id)
                }
            }
        });

        let mut names = Vec::with_capacity(selection.len());
        let mut unresolved = Vec::new();
        for result in join_all(lookups).await {
            match result {
                Ok(name) => names.push(name),
                Err(id) => unresolved.push(id),
            }
        }

        if unresolved.is_empty() {
            Ok(names)
        } else {
            Err(AppError::UnresolvedItems(unresolved))
        }
    }
}

/// Restores the pre-request state if a pending request is dropped.
struct PendingGuard<'a> {
    state: &'a RwLock<Suggestion>,
    previous: Option<Suggestion>,
}

impl Drop for PendingGuard<'_> {
    fn drop(&mut self) {
        if let Some(previous) = self.previous.take() {
            let mut state = self.state.write();
            if *state == Suggestion::Pending {
                warn!("recipe request dropped while pending");
                *state = previous;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::items::repo_types::NewItemDoc;
    use crate::items::ItemPatch;
    use crate::testing::{CannedGenerator, FlakyStore};
    use async_trait::async_trait;
    use std::sync::atomic::Ordering;

    /// Never answers.
    struct Stalled;

    #[async_trait]
    impl TextGenerator for Stalled {
        async fn generate(&self, _model: &str, _prompt: &str) -> Result<String, AppError> {
            std::future::pending().await
        }
    }

    const SOUP: &str = r#"{"name":"Soup","ingredients":["water","salt"],"instructions":["boil"],"nutrition":["low"]}"#;

    async fn seed(store: &Arc<FlakyStore>, names: &[&str]) -> Vec<Uuid> {
        let repo = ItemRepo::new(store.clone());
        let pantry_id = Uuid::new_v4();
        let mut ids = Vec::new();
        for &name in names {
            let doc = NewItemDoc {
                pantry_id,
                name,
                quantity: 1,
                image_url: None,
            };
            ids.push(repo.create(&doc).await.unwrap());
        }
        ids
    }

    fn pipeline(store: Arc<FlakyStore>, generator: Arc<CannedGenerator>) -> RecipePipeline {
        RecipePipeline::new(ItemRepo::new(store), generator, "test/model")
    }

    #[tokio::test]
    async fn well_formed_reply_reaches_ready() {
        let store = FlakyStore::new();
        let ids = seed(&store, &["water", "salt"]).await;
        let pipe = pipeline(store, CannedGenerator::replying(SOUP));

        let out = pipe.suggest(&ids).await.unwrap();

        assert_eq!(out.status(), SuggestionStatus::Ready);
        let recipe = out.recipe().unwrap();
        assert_eq!(recipe.name.as_deref(), Some("Soup"));
        assert_eq!(recipe.ingredients, vec!["water", "salt"]);
        assert_eq!(pipe.current(), out);
    }

    #[tokio::test]
    async fn unparseable_reply_fails_and_keeps_raw() {
        let store = FlakyStore::new();
        let ids = seed(&store, &["egg"]).await;
        let pipe = pipeline(store, CannedGenerator::replying("not json"));

        let out = pipe.suggest(&ids).await.unwrap();

        assert_eq!(out.status(), SuggestionStatus::Failed);
        assert_eq!(out.raw(), Some("not json"));
        assert_eq!(out.error().unwrap().kind(), "parse");
    }

    #[tokio::test]
    async fn empty_selection_is_rejected_without_a_call() {
        let generator = CannedGenerator::replying(SOUP);
        let pipe = pipeline(FlakyStore::new(), generator.clone());

        let err = pipe.suggest(&[]).await.unwrap_err();

        assert_eq!(err.kind(), "validation");
        assert_eq!(generator.calls(), 0);
        assert_eq!(pipe.current(), Suggestion::Idle);
    }

    #[tokio::test]
    async fn unresolved_items_abort_before_generating() {
        let store = FlakyStore::new();
        let ids = seed(&store, &["rice", "beans"]).await;
        let missing = Uuid::new_v4();
        store.fail_get_of(ids[1]);
        let generator = CannedGenerator::replying(SOUP);
        let pipe = pipeline(store, generator.clone());

        let out = pipe.suggest(&[ids[0], ids[1], missing]).await.unwrap();

        assert_eq!(generator.calls(), 0);
        match out.error() {
            Some(AppError::UnresolvedItems(unresolved)) => {
                assert_eq!(unresolved, &vec![ids[1], missing]);
            }
            other => panic!("expected unresolved items, got {:?}", other),
        }
        assert_eq!(out.raw(), None);
    }

    #[tokio::test]
    async fn network_failure_is_reported_apart_from_parse_failure() {
        let store = FlakyStore::new();
        let ids = seed(&store, &["egg"]).await;
        let pipe = pipeline(
            store,
            CannedGenerator::failing(AppError::Network("HTTP 503: Unknown error".into())),
        );

        let out = pipe.suggest(&ids).await.unwrap();

        assert_eq!(out.status(), SuggestionStatus::Failed);
        assert_eq!(out.error().unwrap().kind(), "network");
        assert_eq!(out.raw(), None);
    }

    #[tokio::test]
    async fn prompt_uses_names_from_the_store() {
        let store = FlakyStore::new();
        let ids = seed(&store, &["tomatoe", "basil"]).await;
        ItemRepo::new(store.clone())
            .update(ids[0], &ItemPatch::name("tomato"))
            .await
            .unwrap();
        let generator = CannedGenerator::replying(SOUP);
        let pipe = pipeline(store.clone(), generator.clone());

        pipe.suggest(&ids).await.unwrap();

        let prompt = generator.last_prompt.lock().clone().unwrap();
        assert!(prompt.contains("tomato, basil"), "{}", prompt);
        assert_eq!(store.gets.load(Ordering::SeqCst), 2);
        assert_eq!(generator.last_model.lock().as_deref(), Some("test/model"));
    }

    #[tokio::test]
    async fn reinvocation_replaces_previous_outcome() {
        let store = FlakyStore::new();
        let ids = seed(&store, &["egg"]).await;
        let pipe = pipeline(store.clone(), CannedGenerator::replying("not json"));
        pipe.suggest(&ids).await.unwrap();
        assert_eq!(pipe.current().status(), SuggestionStatus::Failed);

        store.fail_get_of(ids[0]);
        let out = pipe.suggest(&ids).await.unwrap();
        assert!(matches!(out.error(), Some(AppError::UnresolvedItems(_))));
        assert_eq!(pipe.current(), out);
    }

    #[tokio::test]
    async fn dropped_request_restores_previous_state() {
        let store = FlakyStore::new();
        let ids = seed(&store, &["egg"]).await;
        let pipe = RecipePipeline::new(ItemRepo::new(store), Arc::new(Stalled), "test/model");

        let mut request = Box::pin(pipe.suggest(&ids));
        assert!(futures_util::poll!(&mut request).is_pending());
        assert_eq!(pipe.current().status(), SuggestionStatus::Pending);

        drop(request);
        assert_eq!(pipe.current(), Suggestion::Idle);
    }
}
