//! Document store.

use std::sync::Arc;

use tracing::info;

use bookwell_core::allocation::PaymentKind;
use bookwell_core::document::{Document, DocumentFilter, DraftInput, LineItemInput};
use bookwell_core::numbering::NumberingScheme;
use bookwell_core::{BooksError, Clock, TenantContext};
use bookwell_shared::types::{CounterpartyId, DocumentId, PageRequest, PageResponse};

use super::report;
use super::sequence::retry_contended;
use crate::store::{DocumentChange, DocumentRepository};

/// Drafts, posts, voids and lists documents of every kind.
pub struct DocumentStore<S> {
    store: Arc<S>,
    clock: Arc<dyn Clock>,
    scheme: NumberingScheme,
    retries: u32,
}

impl<S: DocumentRepository> DocumentStore<S> {
    /// Creates a document store over `store`.
    pub fn new(store: Arc<S>, clock: Arc<dyn Clock>, scheme: NumberingScheme, retries: u32) -> Self {
        Self {
            store,
            clock,
            scheme,
            retries,
        }
    }

    /// Creates a priced, unnumbered draft.
    ///
    /// # Errors
    ///
    /// Returns `Validation` for missing or invalid lines or inverted dates, and
    /// `NotFound` when the tenant is unknown or deactivated.
    pub async fn create_draft(&self, ctx: &TenantContext, input: DraftInput) -> Result<Document, BooksError> {
        let doc = Document::new_draft(ctx, input, self.clock.now())?;
        self.store
            .insert_document(ctx, &doc)
            .await
            .inspect_err(|err| report("documents.create_draft", ctx, err))?;
        info!(
            tenant_id = %ctx.tenant_id(),
            document_id = %doc.id,
            kind = %doc.kind,
            total = %doc.total,
            "draft created"
        );
        Ok(doc)
    }

    /// Replaces the lines of a draft.
    ///
    /// # Errors
    ///
    /// Returns `InvalidTransition` once the document has left `draft`.
    pub async fn update_draft(
        &self,
        ctx: &TenantContext,
        id: DocumentId,
        lines: Vec<LineItemInput>,
    ) -> Result<Document, BooksError> {
        let doc = self
            .store
            .update_document(ctx, id, DocumentChange::ReplaceLines(lines), self.clock.now())
            .await
            .inspect_err(|err| report("documents.update_draft", ctx, err))?;
        info!(tenant_id = %ctx.tenant_id(), document_id = %id, total = %doc.total, "draft updated");
        Ok(doc)
    }

    /// Deletes a draft. It never had a number, so no gap is left.
    ///
    /// # Errors
    ///
    /// Returns `InvalidTransition` once the document has left `draft`.
    pub async fn delete_draft(&self, ctx: &TenantContext, id: DocumentId) -> Result<(), BooksError> {
        self.store
            .delete_document(ctx, id)
            .await
            .inspect_err(|err| report("documents.delete_draft", ctx, err))?;
        info!(tenant_id = %ctx.tenant_id(), document_id = %id, "draft deleted");
        Ok(())
    }

    /// Posts a draft under the next number of its kind's series.
    ///
    /// # Errors
    ///
    /// - `InvalidTransition` outside `draft`
    /// - `Validation` for an invoice, bill or credit note with a zero total
    /// - `SequenceContention` if the counter stayed busy through every retry
    pub async fn post(&self, ctx: &TenantContext, id: DocumentId) -> Result<Document, BooksError> {
        let kind = self.store.find_document(ctx, id).await?.kind;
        let format = self.scheme.format_for(kind.series());
        let doc = retry_contended(self.retries, || {
            self.store.post_document(ctx, id, format, self.clock.now())
        })
        .await
        .inspect_err(|err| report("documents.post", ctx, err))?;
        info!(
            tenant_id = %ctx.tenant_id(),
            document_id = %id,
            number = doc.number.as_deref().unwrap_or_default(),
            total = %doc.total,
            "document posted"
        );
        Ok(doc)
    }

    /// Voids a posted or partially paid document.
    ///
    /// # Errors
    ///
    /// - `CannotVoidSettled` if it is fully paid
    /// - `InvalidTransition` from `draft` or `void`
    pub async fn void(&self, ctx: &TenantContext, id: DocumentId, reason: &str) -> Result<Document, BooksError> {
        let doc = self
            .store
            .update_document(
                ctx,
                id,
                DocumentChange::Void {
                    reason: reason.to_string(),
                },
                self.clock.now(),
            )
            .await
            .inspect_err(|err| report("documents.void", ctx, err))?;
        info!(
            tenant_id = %ctx.tenant_id(),
            document_id = %id,
            paid = %doc.paid_amount,
            "document voided"
        );
        Ok(doc)
    }

    /// Loads one document.
    pub async fn get(&self, ctx: &TenantContext, id: DocumentId) -> Result<Document, BooksError> {
        self.store.find_document(ctx, id).await
    }

    /// Lists documents matching `filter`, by issue date then creation.
    pub async fn list(
        &self,
        ctx: &TenantContext,
        filter: &DocumentFilter,
        page: PageRequest,
    ) -> Result<PageResponse<Document>, BooksError> {
        self.store.list_documents(ctx, filter, page).await
    }

    /// Open documents of `counterparty` that a `kind` payment can settle,
    /// oldest first.
    pub async fn open_documents(
        &self,
        ctx: &TenantContext,
        counterparty: CounterpartyId,
        kind: PaymentKind,
    ) -> Result<Vec<Document>, BooksError> {
        self.store.open_documents(ctx, counterparty, kind.settles()).await
    }
}
