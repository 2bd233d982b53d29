// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Event dispatch: subscription matching, bounded cascade, effect
//! application.
//!
//! The contract per frame:
//! - the event is appended first, fixing its id and timestamp;
//! - every agent in the frame sees the same context snapshot, taken at
//!   frame start (so the current event heads `recent_events` and
//!   intermediate shared-context mutations stay invisible);
//! - per-agent failures finalize that agent's trace and the frame
//!   continues;
//! - emitted events are buffered and dispatched at `depth + 1` only
//!   after the frame's effects are committed.

use super::Orchestrator;
use crate::error::EngineError;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use troupe_core::{
    AgentContext, AgentId, AgentInstallation, AgentManifest, AgentResult, AgentStatus, Clock,
    EventRecord, EventView, ExecutionTrace, JsonMap, TraceStatus, UserId,
};
use troupe_storage::AgentEffects;

/// How one handler invocation ended.
enum HandlerOutcome {
    Success(AgentResult),
    Failed(String),
    Timeout,
    Cancelled,
}

/// A buffered cascade entry: `(event_type, payload, source_agent)`.
type PendingCascade = (String, JsonMap, AgentId);

impl<C: Clock + 'static> Orchestrator<C> {
    /// Dispatch one event at the given cascade depth.
    ///
    /// Recursion is bounded by `max_event_depth`; exceeding it fails this
    /// sub-dispatch without rolling back shallower frames. The caller
    /// holds the per-user lock for the whole cascade.
    pub(crate) fn dispatch<'a>(
        &'a self,
        user_id: &'a UserId,
        event_type: String,
        payload: JsonMap,
        source_agent: Option<AgentId>,
        depth: u32,
    ) -> Pin<Box<dyn Future<Output = Result<EventRecord, EngineError>> + Send + 'a>> {
        Box::pin(async move {
            if depth >= self.config.max_event_depth {
                return Err(EngineError::DepthExceeded { max: self.config.max_event_depth });
            }

            let event = self.store.append_event(
                user_id,
                &event_type,
                source_agent.clone(),
                payload,
                self.clock.epoch_ms(),
            )?;
            tracing::info!(
                event = %event.id,
                %event_type,
                user = %user_id,
                source = source_agent.as_ref().map(|a| a.as_str()).unwrap_or("external"),
                depth,
                "dispatching event"
            );

            let subscribed =
                self.subscribed_installations(user_id, &event_type, source_agent.as_ref()).await?;

            // Frame snapshots: every agent in this frame sees identical
            // profile, shared context, and recent events (the snapshot is
            // taken after the append, so the current event is first).
            let (user_profile, shared_context) = self.store.read_user_context(user_id)?;
            let recent_events: Vec<EventView> = self
                .store
                .list_recent_events(user_id, self.config.recent_events_limit)
                .iter()
                .map(EventView::from)
                .collect();

            let mut cascade: Vec<PendingCascade> = Vec::new();
            for (installation, manifest) in &subscribed {
                if self.cancel.is_cancelled() {
                    tracing::warn!(event = %event.id, "dispatch cancelled mid-frame");
                    return Err(EngineError::Cancelled);
                }
                self.run_agent(
                    &event,
                    installation,
                    manifest,
                    &user_profile,
                    &shared_context,
                    &recent_events,
                    &mut cascade,
                )
                .await?;
            }

            // Commit-then-cascade: everything above is durable; a failure
            // below never rolls it back.
            for (cascade_type, cascade_payload, source) in cascade {
                if self.cancel.is_cancelled() {
                    tracing::warn!(event = %event.id, "dispatch cancelled, dropping cascades");
                    break;
                }
                match self
                    .dispatch(
                        user_id,
                        cascade_type.clone(),
                        cascade_payload,
                        Some(source.clone()),
                        depth + 1,
                    )
                    .await
                {
                    Ok(_) | Err(EngineError::Cancelled) => {}
                    Err(err) => {
                        tracing::warn!(
                            parent = %event.id,
                            event_type = %cascade_type,
                            source = %source,
                            depth = depth + 1,
                            error = %err,
                            "cascading dispatch failed"
                        );
                    }
                }
            }

            Ok(event)
        })
    }

    /// Resolve the installations subscribed to this event type,
    /// cache-through, excluding the emitting agent (self-loop prevention).
    async fn subscribed_installations(
        &self,
        user_id: &UserId,
        event_type: &str,
        source_agent: Option<&AgentId>,
    ) -> Result<Vec<(AgentInstallation, AgentManifest)>, EngineError> {
        let installations = match self.cache.get_installations(user_id).await {
            Some(installations) => installations,
            None => {
                let installations = self.store.list_active_installations(user_id);
                self.cache.put_installations(user_id, &installations).await;
                installations
            }
        };

        let mut subscribed = Vec::new();
        for installation in installations {
            if source_agent.is_some_and(|source| installation.agent_id == *source) {
                tracing::debug!(
                    agent = %installation.agent_id,
                    %event_type,
                    "skipping source agent (self-loop prevention)"
                );
                continue;
            }

            let key = installation.manifest_key();
            let manifest = match self.cache.get_manifest(&key).await {
                Some(manifest) => Some(manifest),
                None => {
                    let manifest = self.store.get_manifest(&key);
                    if let Some(ref manifest) = manifest {
                        self.cache.put_manifest(manifest).await;
                    }
                    manifest
                }
            };

            match manifest {
                Some(manifest) if manifest.subscribes_to(event_type) => {
                    subscribed.push((installation, manifest));
                }
                Some(_) => {}
                None => {
                    // Catalog drift: the installation references a manifest
                    // the store no longer has. Skip rather than fail the frame.
                    tracing::warn!(
                        installation = %installation.id,
                        manifest = %key,
                        "installation references missing manifest"
                    );
                }
            }
        }
        Ok(subscribed)
    }

    /// Run one subscribed installation against the event and apply its
    /// effects. Handler failures are contained here; storage failures
    /// propagate.
    #[allow(clippy::too_many_arguments)]
    async fn run_agent(
        &self,
        event: &EventRecord,
        installation: &AgentInstallation,
        manifest: &AgentManifest,
        user_profile: &JsonMap,
        shared_context: &JsonMap,
        recent_events: &[EventView],
        cascade: &mut Vec<PendingCascade>,
    ) -> Result<(), EngineError> {
        let trace = ExecutionTrace::started(
            event.id,
            installation.agent_id.clone(),
            installation.id,
            self.clock.epoch_ms(),
        );
        let trace_id = trace.id;
        self.store.record_trace(trace)?;

        let agent = match self.agents.get(&installation.manifest_key()) {
            Ok(agent) => agent,
            Err(err) => {
                self.store.finalize_trace(
                    &trace_id,
                    TraceStatus::Failed,
                    Some(err.to_string()),
                    self.clock.epoch_ms(),
                )?;
                return Ok(());
            }
        };

        let context = AgentContext {
            user_profile: user_profile.clone(),
            shared_context: shared_context.clone(),
            agent_memory: self.store.read_agent_memory(&installation.id),
            recent_events: recent_events.to_vec(),
        };

        let outcome = self.invoke_handler(agent, EventView::from(event), context).await;

        match outcome {
            HandlerOutcome::Success(result) if result.status != AgentStatus::Failed => {
                self.apply_result(event, installation, manifest, result, trace_id, cascade)
                    .await?;
            }
            HandlerOutcome::Success(result) => {
                // The handler returned, but reported failure: contained
                // like a raised error, no effects applied.
                let error =
                    result.error.unwrap_or_else(|| "agent reported failure".to_string());
                tracing::warn!(
                    event = %event.id,
                    agent = %installation.agent_id,
                    %error,
                    "agent reported failure"
                );
                self.store.finalize_trace(
                    &trace_id,
                    TraceStatus::Failed,
                    Some(error),
                    self.clock.epoch_ms(),
                )?;
            }
            HandlerOutcome::Failed(error) => {
                tracing::warn!(
                    event = %event.id,
                    agent = %installation.agent_id,
                    %error,
                    "agent handler failed"
                );
                self.store.finalize_trace(
                    &trace_id,
                    TraceStatus::Failed,
                    Some(error),
                    self.clock.epoch_ms(),
                )?;
            }
            HandlerOutcome::Timeout => {
                tracing::warn!(
                    event = %event.id,
                    agent = %installation.agent_id,
                    timeout_ms = self.config.agent_handler_timeout.as_millis() as u64,
                    "agent handler timed out"
                );
                self.store.finalize_trace(
                    &trace_id,
                    TraceStatus::Failed,
                    Some("timeout".to_string()),
                    self.clock.epoch_ms(),
                )?;
            }
            HandlerOutcome::Cancelled => {
                self.store.finalize_trace(
                    &trace_id,
                    TraceStatus::Failed,
                    Some("cancelled".to_string()),
                    self.clock.epoch_ms(),
                )?;
                return Err(EngineError::Cancelled);
            }
        }
        Ok(())
    }

    /// Invoke the handler off the async runtime, bounded by the
    /// configured timeout and the cancellation token.
    async fn invoke_handler(
        &self,
        agent: Arc<dyn troupe_core::Agent>,
        view: EventView,
        context: AgentContext,
    ) -> HandlerOutcome {
        let handler = tokio::task::spawn_blocking(move || agent.handle_event(&view, &context));

        tokio::select! {
            _ = self.cancel.cancelled() => HandlerOutcome::Cancelled,
            joined = tokio::time::timeout(self.config.agent_handler_timeout, handler) => {
                match joined {
                    Err(_) => HandlerOutcome::Timeout,
                    Ok(Err(join_err)) if join_err.is_panic() => HandlerOutcome::Failed(format!(
                        "agent panicked: {}",
                        crate::tools::panic_message(&join_err.into_panic())
                    )),
                    Ok(Err(join_err)) => HandlerOutcome::Failed(join_err.to_string()),
                    Ok(Ok(Err(failure))) => HandlerOutcome::Failed(failure.to_string()),
                    Ok(Ok(Ok(result))) => HandlerOutcome::Success(result),
                }
            }
        }
    }

    /// Apply a successful handler result: permission-gated shared
    /// context, agent memory, tool requests, then buffer emitted events.
    async fn apply_result(
        &self,
        event: &EventRecord,
        installation: &AgentInstallation,
        manifest: &AgentManifest,
        result: AgentResult,
        trace_id: troupe_core::TraceId,
        cascade: &mut Vec<PendingCascade>,
    ) -> Result<(), EngineError> {
        let mut annotations = Vec::new();

        let shared_context_patch = if result.shared_context_updates.is_empty() {
            None
        } else if manifest.permissions.write_shared_context {
            Some(result.shared_context_updates)
        } else {
            tracing::warn!(
                event = %event.id,
                agent = %installation.agent_id,
                "dropping shared context update: write_shared_context not granted"
            );
            annotations
                .push("shared context update denied: write_shared_context not granted".to_string());
            None
        };
        let shared_written = shared_context_patch.is_some();

        for request in &result.tool_requests {
            if !manifest.tools.contains(&request.tool_id) {
                tracing::warn!(
                    event = %event.id,
                    agent = %installation.agent_id,
                    tool_id = %request.tool_id,
                    "dropping tool request: not in manifest allowlist"
                );
                annotations
                    .push(format!("tool request denied: {} not in allowlist", request.tool_id));
                continue;
            }
            if let Err(err) = self.tools.execute_tool(
                &event.user_id,
                &installation.agent_id,
                installation.id,
                &request.tool_id,
                request.payload.clone(),
            ) {
                // Contained per request; the rest of the effects proceed.
                tracing::warn!(
                    event = %event.id,
                    agent = %installation.agent_id,
                    tool_id = %request.tool_id,
                    error = %err,
                    "tool request failed"
                );
                annotations.push(format!("tool request {} failed: {err}", request.tool_id));
            }
        }

        self.store.commit_agent_effects(AgentEffects {
            user_id: event.user_id.clone(),
            installation_id: installation.id,
            trace_id,
            trace_status: TraceStatus::Completed,
            trace_error: None,
            trace_annotations: annotations,
            shared_context_patch,
            memory_patch: Some(result.agent_memory_updates),
            finished_at_ms: self.clock.epoch_ms(),
        })?;

        if shared_written {
            self.cache.invalidate_shared_context(&event.user_id).await;
        }

        for emitted in result.events {
            cascade.push((emitted.event_type, emitted.payload, installation.agent_id.clone()));
        }
        Ok(())
    }
}
