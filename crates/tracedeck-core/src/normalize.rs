//! Hierarchy normalization: a validated submission becomes a [`NewRun`]
//! entity graph with fresh identities, ready for one atomic store write.
//!
//! Step order is the caller's: the `index` field is carried verbatim with no
//! re-sorting, re-indexing, or contiguity checks. Tool calls keep their array
//! order. Tag names are de-duplicated within the submission (first occurrence
//! wins); resolution against tags from other runs happens in the store.

use uuid::Uuid;

use crate::model::{NewRun, NewStep, NewToolCall, RunId, RunSubmission};

pub fn normalize(submission: RunSubmission) -> NewRun {
    let steps = submission
        .steps
        .into_iter()
        .map(|step| NewStep {
            id: entity_id(),
            index: step.index,
            name: step.name,
            kind: step.kind,
            input: step.input,
            output: step.output,
            error: step.error,
            status: step.status,
            started_at: step.started_at,
            ended_at: step.ended_at,
            tool_calls: step
                .tool_calls
                .into_iter()
                .map(|call| NewToolCall {
                    id: entity_id(),
                    name: call.name,
                    input: call.input,
                    output: call.output,
                    error: call.error,
                    status: call.status,
                    started_at: call.started_at,
                    ended_at: call.ended_at,
                })
                .collect(),
        })
        .collect();

    NewRun {
        id: RunId::new(),
        name: submission.name,
        framework: submission.framework,
        status: submission.status,
        started_at: submission.started_at,
        ended_at: submission.ended_at,
        metadata: submission.metadata,
        tags: dedup_tags(submission.tags),
        steps,
    }
}

fn entity_id() -> String {
    Uuid::new_v4().as_simple().to_string()
}

fn dedup_tags(tags: Vec<String>) -> Vec<String> {
    let mut seen = Vec::with_capacity(tags.len());
    for tag in tags {
        if !seen.contains(&tag) {
            seen.push(tag);
        }
    }
    seen
}
