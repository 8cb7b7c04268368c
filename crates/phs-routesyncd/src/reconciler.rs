//! Reconciler: drives one full convergence cycle and owns the concurrency
//! discipline.
//!
//! A cycle reads topology, resolves the local interface, reads current
//! routes, builds desired state, diffs, and applies the changes in order.
//! At most one cycle executes at a time;
//! triggers arriving while a cycle is in flight coalesce trailing-edge, so
//! exactly one follow-up cycle picks up the latest topology.

use crate::desired::build_desired;
use crate::diff::{diff, Changeset};
use crate::error::{Result, RouteSyncError};
use crate::provider::{InterfaceResolver, RouteTableProvider};
use crate::topology::TopologyClient;
use phs_types::{RouteEntry, RouteSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio::time::Duration;
use tracing::{debug, info, instrument, warn};

/// Outcome of one reconciliation cycle.
///
/// All errors are captured here rather than raised; steady-state operation
/// never crashes the daemon on transient topology or routing-table errors.
#[derive(Debug, Default)]
pub struct CycleResult {
    /// Route operations applied successfully.
    pub applied: usize,
    /// Route operations abandoned before being attempted (shutdown during
    /// the apply phase).
    pub skipped: usize,
    /// Per-host and per-entry errors: malformed topology records and
    /// failed route operations.
    pub errors: Vec<RouteSyncError>,
    /// The error that aborted the cycle before any mutation, if one did.
    pub fatal: Option<RouteSyncError>,
}

impl CycleResult {
    /// Returns true if the cycle ran to completion without any error.
    pub fn is_clean(&self) -> bool {
        self.fatal.is_none() && self.errors.is_empty() && self.skipped == 0
    }

    /// Returns true if the cycle mutated nothing (already converged).
    pub fn is_noop(&self) -> bool {
        self.applied == 0 && self.skipped == 0 && self.errors.is_empty() && self.fatal.is_none()
    }

    fn fatal(err: RouteSyncError) -> Self {
        Self {
            fatal: Some(err),
            ..Self::default()
        }
    }
}

/// Orchestrates reconciliation cycles against the topology source and the
/// platform route table.
pub struct Reconciler {
    topology: Arc<dyn TopologyClient>,
    resolver: Arc<dyn InterfaceResolver>,
    provider: Arc<dyn RouteTableProvider>,

    /// Serializes cycles: the routing table is a single shared mutable
    /// resource and unserialized apply sequences could race.
    cycle_lock: Mutex<()>,

    /// Trigger channel, capacity 1. A trigger landing while a cycle is in
    /// flight parks in the slot; further triggers coalesce into it.
    trigger_tx: mpsc::Sender<()>,
    trigger_rx: std::sync::Mutex<Option<mpsc::Receiver<()>>>,

    shutdown: AtomicBool,
    worker: std::sync::Mutex<Option<JoinHandle<()>>>,
}

/// One queued route operation in the apply phase.
#[derive(Debug, Clone, Copy)]
enum RouteOp {
    Remove(RouteEntry),
    Add(RouteEntry),
}

impl Reconciler {
    /// Creates a reconciler over the given collaborators.
    pub fn new(
        topology: Arc<dyn TopologyClient>,
        resolver: Arc<dyn InterfaceResolver>,
        provider: Arc<dyn RouteTableProvider>,
    ) -> Self {
        let (trigger_tx, trigger_rx) = mpsc::channel(1);
        Self {
            topology,
            resolver,
            provider,
            cycle_lock: Mutex::new(()),
            trigger_tx,
            trigger_rx: std::sync::Mutex::new(Some(trigger_rx)),
            shutdown: AtomicBool::new(false),
            worker: std::sync::Mutex::new(None),
        }
    }

    /// Requests a reconciliation cycle from the worker.
    ///
    /// Never blocks and never queues more than one pending cycle: if a
    /// trigger is already parked, this one coalesces into it. Returns true
    /// if the trigger was newly parked.
    pub fn trigger(&self) -> bool {
        self.trigger_tx.try_send(()).is_ok()
    }

    /// Returns true once shutdown has been requested.
    pub fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::Relaxed)
    }

    /// Starts the worker that turns triggers into cycles.
    ///
    /// The worker also runs a full cycle every `resync_interval` as a
    /// coarse fallback poll, so a missed notification heals on its own.
    pub fn start(self: Arc<Self>, resync_interval: Duration) -> Result<()> {
        let Some(mut trigger_rx) = self
            .trigger_rx
            .lock()
            .map_err(|_| RouteSyncError::internal("trigger receiver lock poisoned"))?
            .take()
        else {
            return Err(RouteSyncError::internal("reconciler already started"));
        };

        let reconciler = Arc::clone(&self);
        let handle = tokio::spawn(async move {
            info!("Reconciliation worker started");
            loop {
                tokio::select! {
                    received = trigger_rx.recv() => {
                        if received.is_none() {
                            break;
                        }
                    }
                    _ = tokio::time::sleep(resync_interval) => {
                        debug!("Fallback resync interval elapsed");
                    }
                }

                if reconciler.is_shutdown() {
                    break;
                }

                let result = reconciler.reconcile_once().await;
                log_cycle_result(&result);
            }

            // Release the route table provider once the in-flight cycle
            // has fully finished.
            if let Err(e) = reconciler.provider.close().await {
                warn!(error = %e, "Failed to close route table provider");
            }
            info!("Reconciliation worker stopped");
        });

        *self
            .worker
            .lock()
            .map_err(|_| RouteSyncError::internal("worker handle lock poisoned"))? = Some(handle);
        Ok(())
    }

    /// Signals shutdown and waits for the in-flight cycle to finish.
    ///
    /// No new cycle starts after this returns; the worker abandons any
    /// route operations still queued in the current changeset after the
    /// one in flight completes, then closes the provider.
    pub async fn stop(&self) {
        self.shutdown.store(true, Ordering::Relaxed);
        // Wake the worker if it is parked on the trigger channel.
        let _ = self.trigger_tx.try_send(());

        let handle = self.worker.lock().ok().and_then(|mut guard| guard.take());
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                warn!(error = %e, "Reconciliation worker task failed");
            }
        }
    }

    /// Runs one full reconciliation cycle.
    ///
    /// Safe to invoke repeatedly and concurrently; cycles are serialized
    /// internally. All errors are captured in the returned [`CycleResult`].
    #[instrument(skip(self))]
    pub async fn reconcile_once(&self) -> CycleResult {
        let _guard = self.cycle_lock.lock().await;

        if self.is_shutdown() {
            debug!("Shutdown requested, not starting a cycle");
            return CycleResult::default();
        }

        match self.run_cycle().await {
            Ok(result) => result,
            Err(e) => CycleResult::fatal(e),
        }
    }

    /// The cycle body. Any error returned here is fatal to the cycle and
    /// happened before the first mutation.
    async fn run_cycle(&self) -> Result<CycleResult> {
        // 1. Topology snapshot. Never apply partial topology.
        let local = self.topology.local_host().await?;
        let hosts = self.topology.hosts().await?;

        // 2. Resolve the local interface from the agent IP.
        let agent_addr = local
            .agent_addr()
            .map_err(|e| RouteSyncError::LocalHostUnresolvable {
                uuid: local.uuid.clone(),
                source: e,
            })?;
        let iface = self.resolver.resolve_interface(agent_addr).await?;

        // 3. Current routes on that interface, self-routes excluded.
        let current: RouteSet = self
            .provider
            .list_routes(iface.index)
            .await?
            .into_iter()
            .filter(|route| route.gateway != agent_addr)
            .collect();
        log_route_set(&current, "current");

        // 4. Desired routes from topology.
        let desired = build_desired(&local, &hosts, iface);
        log_route_set(&desired.routes, "desired");
        for err in &desired.rejected {
            warn!(error = %err, "Excluding malformed host record");
        }

        // 5. Diff.
        let changes = diff(&current, &desired.routes);
        if changes.is_empty() {
            debug!("Route table already converged");
        } else {
            info!(
                add = changes.to_add.len(),
                remove = changes.to_remove.len(),
                replace = changes.to_replace.len(),
                "Applying route changes"
            );
        }

        // 6. Apply, removals strictly before additions.
        let mut result = self.apply(&changes).await;
        let mut errors = desired.rejected;
        errors.append(&mut result.errors);
        result.errors = errors;
        Ok(result)
    }

    /// Applies a changeset entry by entry.
    ///
    /// A failed operation is recorded and does not stop the remaining
    /// entries; partial convergence beats a fully failed cycle. Shutdown
    /// lets the current operation finish and abandons the rest.
    async fn apply(&self, changes: &Changeset) -> CycleResult {
        let mut result = CycleResult::default();

        let mut queue: Vec<RouteOp> = Vec::with_capacity(changes.op_count());
        queue.extend(changes.removals().into_iter().map(RouteOp::Remove));
        queue.extend(changes.additions().into_iter().map(RouteOp::Add));

        for (index, op) in queue.iter().enumerate() {
            if self.is_shutdown() {
                result.skipped = queue.len() - index;
                warn!(abandoned = result.skipped, "Shutdown during apply phase");
                break;
            }

            let (name, entry, outcome) = match op {
                RouteOp::Remove(entry) => {
                    ("remove", entry, self.provider.remove_route(entry).await)
                }
                RouteOp::Add(entry) => ("add", entry, self.provider.add_route(entry).await),
            };

            match outcome {
                Ok(()) => {
                    debug!(route = %entry, op = name, "Applied route change");
                    result.applied += 1;
                }
                Err(e) => {
                    warn!(route = %entry, op = name, error = %e, "Route operation failed");
                    result.errors.push(e);
                }
            }
        }

        result
    }
}

fn log_cycle_result(result: &CycleResult) {
    if let Some(fatal) = &result.fatal {
        warn!(error = %fatal, "Reconciliation cycle aborted");
    } else if result.is_noop() {
        debug!("Reconciliation cycle: no changes");
    } else {
        info!(
            applied = result.applied,
            skipped = result.skipped,
            errors = result.errors.len(),
            "Reconciliation cycle finished"
        );
    }
}

fn log_route_set(routes: &RouteSet, which: &str) {
    if tracing::enabled!(tracing::Level::DEBUG) {
        for route in routes.iter() {
            debug!(route = %route, "{} route", which);
        }
    }
}
