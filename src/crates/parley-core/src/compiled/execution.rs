//! Turn execution: new turns, resumes and the superstep loop

use super::types::{TurnInput, TurnOutcome};
use super::CompiledGraph;
use crate::command::{Goto, NodeOutcome};
use crate::config::RunConfig;
use crate::error::{GraphError, ProtocolError, Result};
use crate::interrupt::{Interrupt, Resume};
use crate::node::NodeContext;
use crate::state::GraphState;
use crate::stream::{GraphEvent, TokenSink};
use crate::{END, START};
use chrono::Utc;
use futures::future::join_all;
use parley_checkpoint::{Checkpoint, CheckpointConfig, CheckpointMetadata, CheckpointSource};
use serde_json::Value;
use std::collections::HashSet;
use tokio::sync::mpsc::UnboundedSender;

pub(crate) type EventSender<S> =
    UnboundedSender<Result<GraphEvent<S, <S as GraphState>::Update>>>;

/// Where the superstep loop starts
struct StepPlan {
    frontier: Vec<String>,
    /// Node re-entered by a resume, with the human's answer
    resume: Option<(String, Value)>,
    /// Nodes scheduled alongside a suspension, run after the resumed node
    deferred: Vec<String>,
    /// Thread-level step of the head checkpoint
    thread_step: i32,
    source: CheckpointSource,
}

impl<S: GraphState> CompiledGraph<S> {
    /// Start a new turn on `config.thread_id` with `input` and run it to END or suspension.
    ///
    /// Fails with [`ProtocolError::SuspensionOutstanding`] while the thread waits for a resume.
    #[tracing::instrument(skip_all, fields(thread_id = %config.thread_id, run_id = %config.run_id))]
    pub async fn invoke(&self, input: S::Update, config: &RunConfig) -> Result<TurnOutcome<S>> {
        self.run(TurnInput::Update(input), config, None).await
    }

    /// Answer the thread's outstanding suspension and continue the turn
    #[tracing::instrument(skip_all, fields(thread_id = %config.thread_id, run_id = %config.run_id))]
    pub async fn resume(&self, resume: Resume, config: &RunConfig) -> Result<TurnOutcome<S>> {
        self.run(TurnInput::Resume(resume), config, None).await
    }

    /// Run either kind of invocation
    pub async fn invoke_input(
        &self,
        input: TurnInput<S::Update>,
        config: &RunConfig,
    ) -> Result<TurnOutcome<S>> {
        self.run(input, config, None).await
    }

    pub(crate) async fn run(
        &self,
        input: TurnInput<S::Update>,
        config: &RunConfig,
        events: Option<&EventSender<S>>,
    ) -> Result<TurnOutcome<S>> {
        let thread_id = config.thread_id.as_str();
        let _guard = self.checkpointer.lock_thread(thread_id).await;
        let checkpoint_config = CheckpointConfig::for_thread(thread_id);
        let head = self.checkpointer.get(&checkpoint_config).await?;

        let (mut state, plan) = match input {
            TurnInput::Update(update) => self.start_turn(head, update, &checkpoint_config).await?,
            TurnInput::Resume(resume) => self.start_resume(head, resume, &checkpoint_config).await?,
        };

        let outcome = self
            .run_steps(&mut state, plan, config, &checkpoint_config, events)
            .await;

        if let Err(err) = &outcome {
            tracing::error!(error = %err, "Turn failed");
        }
        outcome
    }

    async fn start_turn(
        &self,
        head: Option<Checkpoint>,
        update: S::Update,
        checkpoint_config: &CheckpointConfig,
    ) -> Result<(S, StepPlan)> {
        let thread_id = checkpoint_config.require_thread_id()?;

        let (mut state, thread_step) = match head {
            Some(head) => {
                if let Some(pending) = &head.pending_interrupt {
                    if self.spec.limits.interrupts.is_expired(pending, Utc::now()) {
                        tracing::warn!(node = %pending.node, "Discarding expired suspension");
                    } else {
                        return Err(ProtocolError::SuspensionOutstanding {
                            thread_id: thread_id.to_string(),
                            node: pending.node.clone(),
                        }
                        .into());
                    }
                }
                (serde_json::from_value::<S>(head.values)?, head.step + 1)
            }
            None => (S::default(), 0),
        };

        state.apply(update)?;
        let frontier = self.order_frontier(self.successors(START, &Goto::Edges, &state)?);

        self.checkpointer
            .put(
                checkpoint_config,
                Checkpoint::new(serde_json::to_value(&state)?, thread_step).with_next(frontier.clone()),
                CheckpointMetadata::new()
                    .with_source(CheckpointSource::Input)
                    .with_step(thread_step),
            )
            .await?;

        tracing::debug!(step = thread_step, next = ?frontier, "Turn input applied");

        Ok((
            state,
            StepPlan {
                frontier,
                resume: None,
                deferred: Vec::new(),
                thread_step,
                source: CheckpointSource::Loop,
            },
        ))
    }

    async fn start_resume(
        &self,
        head: Option<Checkpoint>,
        resume: Resume,
        checkpoint_config: &CheckpointConfig,
    ) -> Result<(S, StepPlan)> {
        let thread_id = checkpoint_config.require_thread_id()?.to_string();

        let no_pending = || ProtocolError::NoPendingInterrupt {
            thread_id: thread_id.clone(),
        };
        let head = head.ok_or_else(no_pending)?;
        let pending = head.pending_interrupt.clone().ok_or_else(no_pending)?;

        if let Some(target) = &resume.node {
            if *target != pending.node {
                return Err(ProtocolError::WrongNode {
                    thread_id,
                    expected: pending.node,
                    actual: target.clone(),
                }
                .into());
            }
        }

        if !self.has_node(&pending.node) {
            return Err(ProtocolError::UnknownNode {
                thread_id,
                node: pending.node,
            }
            .into());
        }

        if self.spec.limits.interrupts.is_expired(&pending, Utc::now()) {
            tracing::warn!(node = %pending.node, "Resume rejected: suspension expired");
            self.checkpointer
                .put(
                    checkpoint_config,
                    Checkpoint::new(head.values, head.step + 1),
                    CheckpointMetadata::new()
                        .with_source(CheckpointSource::Update)
                        .with_step(head.step + 1)
                        .with_extra("expired_interrupt", Value::String(pending.id.clone())),
                )
                .await?;
            return Err(ProtocolError::InterruptExpired {
                thread_id,
                node: pending.node,
            }
            .into());
        }

        let state = serde_json::from_value::<S>(head.values)?;
        let deferred = head
            .next
            .into_iter()
            .filter(|n| *n != pending.node)
            .collect();

        tracing::debug!(node = %pending.node, "Resuming suspended node");

        Ok((
            state,
            StepPlan {
                frontier: vec![pending.node.clone()],
                resume: Some((pending.node, resume.value)),
                deferred,
                thread_step: head.step,
                source: CheckpointSource::Resume,
            },
        ))
    }

    async fn run_steps(
        &self,
        state: &mut S,
        plan: StepPlan,
        config: &RunConfig,
        checkpoint_config: &CheckpointConfig,
        events: Option<&EventSender<S>>,
    ) -> Result<TurnOutcome<S>> {
        let StepPlan {
            mut frontier,
            mut resume,
            mut deferred,
            mut thread_step,
            mut source,
        } = plan;

        let limit = self.spec.limits.recursion_limit;
        let tokens = events.filter(|_| config.stream_tokens).map(|tx| {
            let tx = tx.clone();
            TokenSink::new(move |node, token| {
                let _ = tx.send(Ok(GraphEvent::Token {
                    node: node.to_string(),
                    content: token.to_string(),
                }));
            })
        });

        // Deferred nodes wait while the resumed node keeps routing back to itself
        let mut repeating = resume.as_ref().map(|(node, _)| node.clone());

        let mut step = 0usize;
        while !frontier.is_empty() {
            if step >= limit {
                return Err(GraphError::RecursionLimit { limit });
            }
            step += 1;
            tracing::debug!(step, nodes = ?frontier, "Running superstep");

            let resume_value = resume.take();
            let snapshot: &S = state;
            let runs = frontier.iter().map(|name| {
                let mut ctx = NodeContext::new(name.clone(), config.clone());
                ctx.step = step;
                if let Some((node, value)) = &resume_value {
                    if node == name {
                        ctx.resume = Some(value.clone());
                    }
                }
                ctx.tokens = tokens.clone();
                let node = self.spec.node(name).cloned();

                async move {
                    let outcome = match node {
                        Some(node) => node.run(snapshot, &ctx).await,
                        None => Err(GraphError::State(format!("node '{}' is not in the graph", ctx.node))),
                    };
                    (ctx.node, outcome)
                }
            });
            let results = join_all(runs).await;

            let mut outcomes = Vec::with_capacity(results.len());
            for (name, result) in results {
                match result {
                    Ok(outcome) => outcomes.push((name, outcome)),
                    Err(err) => {
                        tracing::error!(node = %name, error = %err, "Node failed");
                        return Err(err);
                    }
                }
            }

            let suspended: Vec<String> = outcomes
                .iter()
                .filter(|(_, outcome)| outcome.is_suspend())
                .map(|(name, _)| name.clone())
                .collect();
            if suspended.len() > 1 {
                return Err(ProtocolError::ConcurrentSuspend { nodes: suspended }.into());
            }

            let mut writes = Vec::new();
            let mut gotos = Vec::new();
            let mut suspension = None;
            for (name, outcome) in outcomes {
                match outcome {
                    NodeOutcome::Continue(command) => {
                        if let Some(tx) = events {
                            let _ = tx.send(Ok(GraphEvent::Update {
                                node: name.clone(),
                                step,
                                update: command.update.clone(),
                            }));
                        }
                        state.apply(command.update)?;
                        writes.push(name.clone());
                        gotos.push((name, command.goto));
                    }
                    NodeOutcome::Suspend(prompt) => suspension = Some((name, prompt)),
                }
            }

            let mut next = Vec::new();
            for (name, goto) in &gotos {
                next.extend(self.successors(name, goto, state)?);
            }
            thread_step += 1;

            if let Some((node, prompt)) = suspension {
                let interrupt = Interrupt::new(node.clone(), prompt);
                let mut pending = vec![node];
                pending.extend(next);
                pending.extend(deferred);
                let pending = self.order_frontier(pending);

                self.checkpointer
                    .put(
                        checkpoint_config,
                        Checkpoint::new(serde_json::to_value(&*state)?, thread_step)
                            .with_next(pending)
                            .with_interrupt(interrupt.clone()),
                        CheckpointMetadata::new()
                            .with_source(source)
                            .with_step(thread_step)
                            .with_writes(writes),
                    )
                    .await?;

                tracing::info!(node = %interrupt.node, "Turn suspended for human input");
                if let Some(tx) = events {
                    let _ = tx.send(Ok(GraphEvent::Interrupted {
                        interrupt: interrupt.clone(),
                    }));
                }
                return Ok(TurnOutcome::Suspended {
                    state: state.clone(),
                    interrupt,
                });
            }

            if repeating.as_ref().is_some_and(|node| next.contains(node)) {
                tracing::debug!(deferred = ?deferred, "Resumed node re-entered, holding deferred nodes");
            } else {
                repeating = None;
                next.append(&mut deferred);
            }
            frontier = self.order_frontier(next);

            self.checkpointer
                .put(
                    checkpoint_config,
                    Checkpoint::new(serde_json::to_value(&*state)?, thread_step).with_next(frontier.clone()),
                    CheckpointMetadata::new()
                        .with_source(source)
                        .with_step(thread_step)
                        .with_writes(writes),
                )
                .await?;
            source = CheckpointSource::Loop;
        }

        if let Some(tx) = events {
            let _ = tx.send(Ok(GraphEvent::Completed {
                state: state.clone(),
            }));
        }
        Ok(TurnOutcome::Completed {
            state: state.clone(),
        })
    }

    /// Nodes that follow `from` given its goto and the updated state
    fn successors(&self, from: &str, goto: &Goto, state: &S) -> Result<Vec<String>> {
        let targets = match goto.targets() {
            Some(targets) => targets,
            None => {
                let mut targets = self.spec.edges.get(from).cloned().unwrap_or_default();
                for branch in self.spec.branches.get(from).into_iter().flatten() {
                    let routed = (branch.router)(state).targets();
                    if let Some(bad) = routed
                        .iter()
                        .find(|t| !branch.targets.is_empty() && !branch.targets.contains(t))
                    {
                        return Err(GraphError::node_execution(
                            from,
                            format!("router returned undeclared target '{}'", bad),
                        ));
                    }
                    targets.extend(routed);
                }
                targets
            }
        };

        let targets: Vec<String> = targets.into_iter().filter(|t| t != END).collect();
        if let Some(unknown) = targets.iter().find(|t| !self.has_node(t)) {
            return Err(GraphError::node_execution(
                from,
                format!("routed to unknown node '{}'", unknown),
            ));
        }
        Ok(targets)
    }

    /// De-duplicate and sort by declaration order
    fn order_frontier(&self, nodes: Vec<String>) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut ordered: Vec<String> = nodes
            .into_iter()
            .filter(|n| n != END && seen.insert(n.clone()))
            .collect();
        ordered.sort_by_key(|n| self.spec.position(n));
        ordered
    }
}
