//! Allocation planning.
//!
//! The planner never touches storage. It receives the payment and the
//! documents a backend has loaded (and locked) for the tenant, and returns the
//! full set of new values. Backends write the plan back in one unit or not at
//! all, so a rejected batch leaves nothing behind.

use std::collections::{BTreeMap, HashSet};

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use bookwell_shared::types::money::is_money_scaled;
use bookwell_shared::types::{AllocationId, DocumentId};

use crate::allocation::types::{Allocation, AllocationRequest, Payment};
use crate::document::Document;
use crate::error::BooksError;

/// The outcome of a successful allocation batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllocationPlan {
    /// The payment with the new allocations appended.
    pub payment: Payment,
    /// Updated copies of every touched document, in first-touch order.
    pub documents: Vec<Document>,
    /// The allocations added by this batch.
    pub allocations: Vec<Allocation>,
}

impl AllocationPlan {
    /// What stays on account after the batch.
    #[must_use]
    pub fn remaining(&self) -> Decimal {
        self.payment.unallocated_amount()
    }

    /// Returns true if the batch allocated nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.allocations.is_empty()
    }
}

/// Stateless allocation planner.
pub struct AllocationService;

impl AllocationService {
    /// Plans an explicit batch of allocations.
    ///
    /// `documents` must contain every requested document that exists for the
    /// payment's tenant; anything else counts as not found. Requests for the
    /// same document are summed against its outstanding amount.
    ///
    /// # Errors
    ///
    /// - `Validation` if the batch is empty
    /// - `AllocationRejected` naming the first failing request
    pub fn plan(
        payment: &Payment,
        requests: &[AllocationRequest],
        documents: &[Document],
        now: DateTime<Utc>,
    ) -> Result<AllocationPlan, BooksError> {
        if requests.is_empty() {
            return Err(BooksError::Validation(
                "an allocation batch needs at least one entry".into(),
            ));
        }

        let available = payment.unallocated_amount();
        let side = payment.kind.settles();
        let loaded: BTreeMap<DocumentId, &Document> = documents
            .iter()
            .filter(|doc| doc.tenant_id == payment.tenant_id)
            .map(|doc| (doc.id, doc))
            .collect();

        let mut touched: Vec<Document> = Vec::new();
        let mut slots: BTreeMap<DocumentId, usize> = BTreeMap::new();
        let mut requested: BTreeMap<DocumentId, Decimal> = BTreeMap::new();
        let mut allocations = Vec::with_capacity(requests.len());
        let mut running = Decimal::ZERO;

        for (position, request) in requests.iter().enumerate() {
            let reject = |err: BooksError| err.rejected_at(position);

            if request.amount <= Decimal::ZERO || !is_money_scaled(request.amount) {
                return Err(reject(BooksError::Validation(format!(
                    "allocation amount must be a positive amount in cents, got {}",
                    request.amount
                ))));
            }
            let Some(original) = loaded.get(&request.document_id) else {
                return Err(reject(BooksError::not_found(
                    "document",
                    request.document_id,
                )));
            };
            if original.counterparty_id != payment.counterparty_id {
                return Err(reject(BooksError::Validation(format!(
                    "document {} belongs to a different counterparty",
                    original.id
                ))));
            }
            if original.kind.settlement_side() != Some(side) {
                return Err(reject(BooksError::Validation(format!(
                    "a {} cannot settle a {}",
                    payment.kind, original.kind
                ))));
            }

            let cumulative = requested
                .get(&original.id)
                .copied()
                .unwrap_or_default()
                .checked_add(request.amount)
                .ok_or_else(|| reject(BooksError::out_of_range()))?;
            if original.status.is_open() && cumulative > original.outstanding_amount {
                return Err(reject(BooksError::OverAllocation {
                    document_id: original.id,
                    requested: cumulative,
                    outstanding: original.outstanding_amount,
                }));
            }

            running = running
                .checked_add(request.amount)
                .ok_or_else(|| reject(BooksError::out_of_range()))?;
            if running > available {
                return Err(reject(BooksError::ExceedsUnallocated {
                    requested: running,
                    available,
                }));
            }

            let slot = *slots.entry(original.id).or_insert_with(|| {
                touched.push((*original).clone());
                touched.len() - 1
            });
            touched[slot]
                .apply_allocation(request.amount, now)
                .map_err(reject)?;
            requested.insert(original.id, cumulative);

            allocations.push(Allocation {
                id: AllocationId::new(),
                payment_id: payment.id,
                document_id: original.id,
                amount: request.amount,
                allocated_at: now,
            });
        }

        let mut updated = payment.clone();
        updated.allocations.extend(allocations.iter().cloned());
        updated.version += 1;
        updated.updated_at = now;

        if updated.unallocated_amount() < Decimal::ZERO {
            return Err(BooksError::RoundingInvariantViolation(format!(
                "payment {} allocated beyond its amount",
                payment.id
            )));
        }

        Ok(AllocationPlan {
            payment: updated,
            documents: touched,
            allocations,
        })
    }

    /// Greedy requests over `candidates` in the given order: each open
    /// document takes `min(remaining, outstanding)` until the payment runs out.
    #[must_use]
    pub fn auto_requests(payment: &Payment, candidates: &[Document]) -> Vec<AllocationRequest> {
        let mut remaining = payment.unallocated_amount();
        let mut seen = HashSet::new();
        let mut requests = Vec::new();

        for doc in candidates {
            if remaining <= Decimal::ZERO {
                break;
            }
            if !doc.status.is_open() || doc.outstanding_amount <= Decimal::ZERO {
                continue;
            }
            if !seen.insert(doc.id) {
                continue;
            }
            let amount = remaining.min(doc.outstanding_amount);
            requests.push(AllocationRequest::new(doc.id, amount));
            remaining -= amount;
        }
        requests
    }

    /// Plans a greedy allocation over `candidates`, oldest first as given.
    ///
    /// Settled or void candidates are skipped. If nothing can be allocated the
    /// plan is empty and the payment stays on account.
    ///
    /// # Errors
    ///
    /// Returns `AllocationRejected` if a candidate belongs to another
    /// counterparty or the wrong settlement side.
    pub fn plan_auto(
        payment: &Payment,
        candidates: &[Document],
        now: DateTime<Utc>,
    ) -> Result<AllocationPlan, BooksError> {
        let requests = Self::auto_requests(payment, candidates);
        if requests.is_empty() {
            return Ok(AllocationPlan {
                payment: payment.clone(),
                documents: Vec::new(),
                allocations: Vec::new(),
            });
        }
        Self::plan(payment, &requests, candidates, now)
    }

    /// Sorts documents oldest first: due date, issue date, then number.
    pub fn order_candidates(documents: &mut [Document]) {
        documents.sort_by(|a, b| {
            a.due_date
                .cmp(&b.due_date)
                .then(a.issue_date.cmp(&b.issue_date))
                .then_with(|| a.number.cmp(&b.number))
                .then(a.created_at.cmp(&b.created_at))
        });
    }
}
