//! The single owner of application state.
//!
//! Input handlers mutate one piece of [`AppState`] each; mutations go through
//! the [`Gateway`] and are always followed by a full re-fetch of the
//! collection (unless `refresh_on_failure` is off and the mutation failed).

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::gateway::{Gateway, GatewayError};
use crate::model::{Field, Product, ProductDraft, ProductId, ValidationError};
use crate::pipeline::{self, Page, ViewState};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ModalMode {
    Create,
    Edit,
}

impl ModalMode {
    pub fn submit_label(self) -> &'static str {
        match self {
            ModalMode::Create => "Save",
            ModalMode::Edit => "Update",
        }
    }
}

/// The create/edit form. `editing` outlives a failed update on purpose:
/// it is only cleared once an update succeeds or a new form is opened.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Modal {
    pub open: bool,
    pub editing: Option<ProductId>,
    pub draft: ProductDraft,
}

impl Modal {
    pub fn mode(&self) -> ModalMode {
        if self.editing.is_some() {
            ModalMode::Edit
        } else {
            ModalMode::Create
        }
    }

    fn close(&mut self) {
        self.open = false;
        self.draft = ProductDraft::default();
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "message", rename_all = "lowercase")]
pub enum Notice {
    Success(String),
    Error(String),
}

#[derive(Clone, Debug, Default, Serialize)]
pub struct AppState {
    pub products: Vec<Product>,
    pub view: ViewState,
    pub modal: Modal,
    pub notices: Vec<Notice>,
}

impl AppState {
    pub fn page(&self) -> Page<'_> {
        pipeline::derive(&self.products, &self.view)
    }

    pub fn find(&self, id: &ProductId) -> Option<&Product> {
        self.products.iter().find(|p| &p.id == id)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ControllerOptions {
    /// Re-fetch after a mutation the server rejected.
    pub refresh_on_failure: bool,
}

impl Default for ControllerOptions {
    fn default() -> Self {
        Self {
            refresh_on_failure: true,
        }
    }
}

/// Handle for an outstanding list request. Results are applied in issue
/// order: a ticket older than the last applied one is dropped.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RefreshTicket {
    generation: u64,
}

#[derive(Debug)]
pub enum RefreshOutcome {
    Applied { count: usize },
    Stale,
    Failed(GatewayError),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mutation {
    Created,
    Updated,
    Deleted,
    /// The user declined the delete confirmation.
    Declined,
}

#[derive(Debug, Error)]
pub enum MutationError {
    #[error("the product form is not open")]
    FormClosed,

    #[error("no product with id {id}")]
    UnknownProduct { id: ProductId },

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Gateway(#[from] GatewayError),
}

pub struct Controller<G> {
    gateway: G,
    options: ControllerOptions,
    state: AppState,
    issued: u64,
    applied: u64,
}

impl<G: Gateway> Controller<G> {
    pub fn new(gateway: G, options: ControllerOptions) -> Self {
        Self {
            gateway,
            options,
            state: AppState::default(),
            issued: 0,
            applied: 0,
        }
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    pub fn page(&self) -> Page<'_> {
        self.state.page()
    }

    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.state.notices)
    }

    fn total_pages(&self) -> usize {
        self.state.page().total_pages
    }

    pub fn begin_refresh(&mut self) -> RefreshTicket {
        self.issued += 1;
        RefreshTicket {
            generation: self.issued,
        }
    }

    /// Replaces the collection wholesale and clamps the page into range.
    pub fn finish_refresh(
        &mut self,
        ticket: RefreshTicket,
        result: Result<Vec<Product>, GatewayError>,
    ) -> RefreshOutcome {
        if ticket.generation <= self.applied {
            debug!(
                generation = ticket.generation,
                applied = self.applied,
                "dropping stale product list"
            );
            return RefreshOutcome::Stale;
        }
        match result {
            Ok(products) => {
                self.applied = ticket.generation;
                let count = products.len();
                self.state.products = products;
                let total = self.total_pages();
                self.state.view.clamp(total);
                info!(count, "product list refreshed");
                RefreshOutcome::Applied { count }
            }
            Err(e) => {
                warn!(error = %e, "failed to fetch products");
                self.state.notices.push(Notice::Error(e.user_message()));
                RefreshOutcome::Failed(e)
            }
        }
    }

    pub async fn refresh(&mut self) -> RefreshOutcome {
        let ticket = self.begin_refresh();
        let result = self.gateway.list().await;
        self.finish_refresh(ticket, result)
    }

    pub fn set_search(&mut self, term: &str) {
        self.state.view.set_search(term);
    }

    pub fn click_header(&mut self, field: Field) {
        self.state.view.click_header(field);
    }

    pub fn goto_page(&mut self, page: usize) -> bool {
        let total = self.total_pages();
        self.state.view.goto(page, total)
    }

    pub fn next_page(&mut self) -> bool {
        let total = self.total_pages();
        self.state.view.next(total)
    }

    pub fn prev_page(&mut self) -> bool {
        let total = self.total_pages();
        self.state.view.prev(total)
    }

    pub fn open_create(&mut self) {
        self.state.modal = Modal {
            open: true,
            editing: None,
            draft: ProductDraft::default(),
        };
    }

    pub fn open_edit(&mut self, id: &ProductId) -> Result<(), MutationError> {
        let product = self
            .state
            .find(id)
            .ok_or_else(|| MutationError::UnknownProduct { id: id.clone() })?;
        let draft = ProductDraft::from_product(product);
        self.state.modal = Modal {
            open: true,
            editing: Some(id.clone()),
            draft,
        };
        Ok(())
    }

    pub fn set_draft_field(&mut self, field: Field, value: &str) -> Result<(), MutationError> {
        if !self.state.modal.open {
            return Err(MutationError::FormClosed);
        }
        self.state.modal.draft.set(field, value);
        Ok(())
    }

    pub fn cancel_form(&mut self) {
        self.state.modal.close();
    }

    /// Creates or updates depending on the form mode. A validation failure
    /// leaves the form open and sends nothing; any gateway answer closes it.
    pub async fn submit(&mut self) -> Result<Mutation, MutationError> {
        if !self.state.modal.open {
            return Err(MutationError::FormClosed);
        }
        let payload = match self.state.modal.draft.to_payload() {
            Ok(payload) => payload,
            Err(e) => {
                self.state.notices.push(Notice::Error(e.to_string()));
                return Err(e.into());
            }
        };

        let editing = self.state.modal.editing.clone();
        let result = match editing.as_ref() {
            Some(id) => self
                .gateway
                .update(id, &payload)
                .await
                .map(|_| Mutation::Updated),
            None => self
                .gateway
                .create(&payload)
                .await
                .map(|_| Mutation::Created),
        };

        match &result {
            Ok(Mutation::Updated) => {
                self.state.modal.editing = None;
                self.state
                    .notices
                    .push(Notice::Success("Product updated successfully.".to_string()));
            }
            Ok(_) => {
                self.state
                    .notices
                    .push(Notice::Success("Product added successfully.".to_string()));
            }
            Err(e) => {
                warn!(error = %e, "failed to save product");
                self.state.notices.push(Notice::Error(e.user_message()));
            }
        }
        self.state.modal.close();

        if result.is_ok() || self.options.refresh_on_failure {
            self.refresh().await;
        }
        result.map_err(MutationError::from)
    }

    /// Deletes after `confirm` approves the product about to go.
    pub async fn delete<F>(&mut self, id: &ProductId, confirm: F) -> Result<Mutation, MutationError>
    where
        F: FnOnce(&Product) -> bool,
    {
        let product = self
            .state
            .find(id)
            .ok_or_else(|| MutationError::UnknownProduct { id: id.clone() })?;
        if !confirm(product) {
            return Ok(Mutation::Declined);
        }

        let result = self.gateway.delete(id).await.map(|_| Mutation::Deleted);
        match &result {
            Ok(_) => self
                .state
                .notices
                .push(Notice::Success("Product deleted successfully.".to_string())),
            Err(e) => {
                warn!(error = %e, id = %id, "failed to delete product");
                self.state.notices.push(Notice::Error(e.user_message()));
            }
        }

        if result.is_ok() || self.options.refresh_on_failure {
            self.refresh().await;
        }
        result.map_err(MutationError::from)
    }
}
