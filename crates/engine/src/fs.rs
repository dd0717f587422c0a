// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The file system façade: component construction, the event funnel and
//! one method per cluster operation.

use crate::action::{ActionBatch, ActionId, ActionKind, Launched, LocalAction, WorkerHandler, WorkerReport};
use crate::client_actions::{ClientAction, ClientOp};
use crate::install::InstallHandler;
use crate::modules::{LoadModules, UnloadModules};
use crate::mountdata;
use crate::proxy::ProxyAction;
use crate::router_actions::{RouterAction, RouterOp};
use crate::runner::run_batch;
use crate::target_actions::{TargetAction, TargetOp};
use crate::tune::{ApplyTuning, TuningModel};
use crate::FsError;
use shine_adapters::RemoteShell;
use shine_core::{
    Client, ClientError, Component, ComponentGroup, ComponentSnapshot, ErrorResult, EventHandler,
    FsEvent, Mode, NodeSet, Procfs, Router, Server, Settings, State, Target, TargetError,
    TargetKind,
};
use std::collections::BTreeSet;
use std::path::PathBuf;

/// Whether local status checks read the on-disk configuration record.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum MountdataPolicy {
    #[default]
    Auto,
    Never,
    Always,
}

impl MountdataPolicy {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "auto" => Some(Self::Auto),
            "never" => Some(Self::Never),
            "always" => Some(Self::Always),
            _ => None,
        }
    }
}

/// Per-operation options, forwarded to distant invocations.
#[derive(Debug, Clone, Default)]
pub struct OpOptions {
    /// Extra options appended to the underlying tool command line; for
    /// `execute`, the command itself.
    pub addopts: Option<String>,
    /// Failover candidate nodes, forwarded with `-F`.
    pub failover: Option<String>,
    pub mountdata: MountdataPolicy,
}

/// Optional attributes of a new target.
#[derive(Debug, Clone)]
pub struct TargetOpts {
    pub jdev: Option<PathBuf>,
    pub group: Option<String>,
    pub tag: Option<String>,
    pub enabled: bool,
    pub mode: Mode,
    pub failservers: Vec<Server>,
}

impl Default for TargetOpts {
    fn default() -> Self {
        Self {
            jdev: None,
            group: None,
            tag: None,
            enabled: true,
            mode: Mode::Managed,
            failservers: Vec::new(),
        }
    }
}

/// One administered file system: the component registry, the event funnel
/// and the per-operation entry points.
pub struct FileSystem {
    pub fs_name: String,
    pub debug: bool,
    pub components: ComponentGroup,
    /// Set when a management target is attached.
    pub mgt_id: Option<String>,
    /// Per-run remote failures: `(nodes, message)`.
    pub proxy_errors: Vec<(NodeSet, String)>,
    pub settings: Settings,
    pub procfs: Procfs,
    event_handler: Option<Box<dyn EventHandler>>,
}

impl FileSystem {
    pub fn new(fs_name: impl Into<String>, settings: Settings) -> Self {
        Self {
            fs_name: fs_name.into(),
            debug: false,
            components: ComponentGroup::new(),
            mgt_id: None,
            proxy_errors: Vec::new(),
            settings,
            procfs: Procfs::default(),
            event_handler: None,
        }
    }

    pub fn set_event_handler(&mut self, handler: Box<dyn EventHandler>) {
        self.event_handler = Some(handler);
    }

    // ── construction ────────────────────────────────────────────────────

    /// Create and attach a new target.
    pub fn new_target(
        &mut self,
        server: Server,
        kind: &str,
        index: u32,
        dev: &str,
        opts: TargetOpts,
    ) -> Result<String, FsError> {
        let Some(kind) = TargetKind::parse(kind) else {
            return Err(FsError::BadTargetType(kind.to_string()));
        };
        if kind == TargetKind::Mgt && self.mgt_id.is_some() {
            return Err(FsError::Structure(
                "a file system has only one management target".to_string(),
            ));
        }

        let mut target = Target::new(&self.fs_name, kind, index, dev, server);
        target.journal = opts.jdev.map(shine_core::Disk::new);
        target.group = opts.group;
        target.tag = opts.tag;
        target.enabled = opts.enabled;
        target.mode = opts.mode;
        if target.mode.is_external() {
            target.state = Some(State::External);
        }
        for failserver in opts.failservers {
            target.add_server(failserver);
        }

        let id = self.components.add(Component::Target(target))?;
        if kind == TargetKind::Mgt {
            self.mgt_id = Some(id.clone());
        }
        Ok(id)
    }

    /// Create and attach a new client.
    pub fn new_client(
        &mut self,
        server: Server,
        mount_path: &str,
        mount_options: Option<String>,
        enabled: bool,
        mode: Mode,
    ) -> Result<String, FsError> {
        let mut client = Client::new(&self.fs_name, server, mount_path, mount_options);
        client.enabled = enabled;
        client.mode = mode;
        if client.mode.is_external() {
            client.state = Some(State::External);
        }
        Ok(self.components.add(Component::Client(client))?)
    }

    /// Create and attach a new router.
    pub fn new_router(
        &mut self,
        server: Server,
        enabled: bool,
        mode: Mode,
    ) -> Result<String, FsError> {
        let mut router = Router::new(&self.fs_name, server);
        router.enabled = enabled;
        router.mode = mode;
        if router.mode.is_external() {
            router.state = Some(State::External);
        }
        Ok(self.components.add(Component::Router(router))?)
    }

    /// Network identifiers of the management target's servers.
    pub fn mgs_nids(&self) -> Vec<String> {
        self.mgt_id
            .as_deref()
            .and_then(|id| self.components.get(id))
            .and_then(Component::as_target)
            .map(Target::get_nids)
            .unwrap_or_default()
    }

    pub(crate) fn target_mount_point(&self, target: &Target) -> PathBuf {
        self.settings
            .mount_prefix
            .join(&self.fs_name)
            .join(target.label())
    }

    pub(crate) fn command_path(&self) -> PathBuf {
        if let Some(path) = &self.settings.command_path {
            return path.clone();
        }
        std::env::current_exe().unwrap_or_else(|_| PathBuf::from("shine"))
    }

    // ── event funnel ────────────────────────────────────────────────────

    fn emit(&mut self, event: FsEvent) {
        if let Some(handler) = self.event_handler.as_mut() {
            handler.event_callback(&event);
        }
    }

    /// Raise an event for something that happened on this node.
    pub fn local_event(
        &mut self,
        compname: &str,
        action: &str,
        status: &str,
        comp_id: Option<&str>,
        result: Option<ErrorResult>,
    ) {
        let comp = comp_id
            .and_then(|id| self.components.get(id))
            .map(Component::snapshot);
        let event = FsEvent {
            compname: compname.to_string(),
            action: action.to_string(),
            status: status.to_string(),
            node: Server::hostname_short(),
            comp,
            result,
        };
        self.emit(event);
    }

    /// Reconcile an event reported by a distant invocation, then forward it
    /// with the local component substituted in.
    ///
    /// Lookup misses are logged and the event is dropped; they do not count
    /// toward the aggregate state.
    pub fn distant_event(
        &mut self,
        compname: &str,
        action: &str,
        status: &str,
        node: &str,
        comp: Option<ComponentSnapshot>,
        result: Option<ErrorResult>,
    ) {
        let comp = match comp {
            None => None,
            Some(snap) if snap.compname == "journal" => {
                // Journals are reached through their owning target; they are
                // not registry entries of their own.
                let Some(target) = self
                    .components
                    .get_mut(&snap.uniqueid)
                    .and_then(Component::as_target_mut)
                else {
                    tracing::warn!(uniqueid = %snap.uniqueid, "journal update failed: unknown target");
                    return;
                };
                let Some(journal) = target.journal.as_mut() else {
                    tracing::warn!(uniqueid = %snap.uniqueid, "journal update failed: no journal device");
                    return;
                };
                if let Some(disk) = &snap.disk {
                    journal.update_from(disk);
                }
                Some(ComponentSnapshot {
                    compname: "journal".to_string(),
                    uniqueid: snap.uniqueid.clone(),
                    label: snap.label.clone(),
                    state: snap.state,
                    status_info: None,
                    index: None,
                    disk: Some(journal.clone()),
                })
            }
            Some(snap) => {
                let Some(local) = self.components.get_mut(&snap.uniqueid) else {
                    tracing::warn!(uniqueid = %snap.uniqueid, "component update failed: unknown component");
                    return;
                };
                local.update_from(&snap);
                Some(local.snapshot())
            }
        };

        let event = FsEvent {
            compname: compname.to_string(),
            action: action.to_string(),
            status: status.to_string(),
            node: node.to_string(),
            comp,
            result,
        };
        self.emit(event);
    }

    pub(crate) fn report_proxy_error(&mut self, nodes: NodeSet, message: String) {
        self.proxy_errors.push((nodes, message));
    }

    // ── component action bookkeeping ────────────────────────────────────

    fn compname_of(&self, id: &str) -> Option<&'static str> {
        self.components.get(id).map(Component::compname)
    }

    pub(crate) fn comp_action_start(&mut self, id: &str, action: &str) {
        let Some(compname) = self.compname_of(id) else {
            return;
        };
        if let Some(comp) = self.components.get_mut(id) {
            comp.add_action(action);
        }
        self.local_event(compname, action, "start", Some(id), None);
    }

    pub(crate) fn comp_action_done(&mut self, id: &str, action: &str) {
        let Some(compname) = self.compname_of(id) else {
            return;
        };
        if let Some(comp) = self.components.get_mut(id) {
            comp.del_action(action);
        }
        self.local_event(compname, action, "done", Some(id), None);
    }

    pub(crate) fn comp_action_failed(
        &mut self,
        id: &str,
        action: &str,
        rc: Option<i32>,
        message: String,
    ) {
        let Some(compname) = self.compname_of(id) else {
            return;
        };
        if let Some(comp) = self.components.get_mut(id) {
            comp.del_action(action);
        }
        let result = ErrorResult {
            message: Some(message),
            retcode: rc,
        };
        self.local_event(compname, action, "failed", Some(id), Some(result));
    }

    pub(crate) fn comp_action_timeout(&mut self, id: &str, action: &str) {
        let Some(compname) = self.compname_of(id) else {
            return;
        };
        if let Some(comp) = self.components.get_mut(id) {
            comp.del_action(action);
        }
        self.local_event(compname, action, "timeout", Some(id), None);
    }

    pub(crate) fn set_comp_state(&mut self, id: &str, state: Option<State>) {
        if let Some(comp) = self.components.get_mut(id) {
            comp.set_state(state);
        }
    }

    pub(crate) fn set_comp_status_info(&mut self, id: &str, info: Option<String>) {
        if let Some(comp) = self.components.get_mut(id) {
            comp.set_status_info(info);
        }
    }

    // ── local probes ────────────────────────────────────────────────────

    /// Device, on-disk record and live checks of one local target.
    pub(crate) async fn target_check_status(
        &mut self,
        id: &str,
        mountdata: bool,
    ) -> Result<(), TargetError> {
        let procfs = self.procfs.clone();
        let (dev, fsname_check, svname_check) = {
            let Some(target) = self.components.get(id).and_then(Component::as_target) else {
                return Ok(());
            };
            // The management target's on-disk fsname is not meaningful.
            let fsname_check = match target.kind {
                TargetKind::Mgt => None,
                _ => Some(target.fs_name.clone()),
            };
            (target.disk.dev.clone(), fsname_check, target.label())
        };

        let device_result = self
            .components
            .get_mut(id)
            .and_then(Component::as_target_mut)
            .map(|target| target.disk.device_check(&procfs))
            .unwrap_or(Ok(()));
        if let Err(err) = device_result {
            self.set_comp_state(id, Some(State::TargetError));
            return Err(err.into());
        }

        if mountdata {
            let data = match mountdata::dump_mount_data(&dev).await {
                Ok(data) => data,
                Err(err) => {
                    self.set_comp_state(id, Some(State::TargetError));
                    return Err(err.into());
                }
            };
            let record_result = self
                .components
                .get_mut(id)
                .and_then(Component::as_target_mut)
                .map(|target| {
                    target.disk.check_mount_data(
                        &data,
                        fsname_check.as_deref(),
                        Some(&svname_check),
                    )
                })
                .unwrap_or(Ok(()));
            if let Err(err) = record_result {
                self.set_comp_state(id, Some(State::TargetError));
                return Err(err.into());
            }
        }

        self.target_lustre_check(id)
    }

    /// Live (kernel) probe of one local target.
    pub(crate) fn target_lustre_check(&mut self, id: &str) -> Result<(), TargetError> {
        let procfs = self.procfs.clone();
        self.components
            .get_mut(id)
            .and_then(Component::as_target_mut)
            .map(|target| target.lustre_check(&procfs))
            .unwrap_or(Ok(()))
    }

    pub(crate) fn client_mount_check(&mut self, id: &str) -> Result<(), ClientError> {
        let procfs = self.procfs.clone();
        match self.components.get_mut(id) {
            Some(Component::Client(client)) => client.mount_check(&procfs),
            _ => Ok(()),
        }
    }

    pub(crate) fn router_status_check(&mut self, id: &str) {
        let procfs = self.procfs.clone();
        if let Some(Component::Router(router)) = self.components.get_mut(id) {
            router.status_check(&procfs);
        }
    }

    // ── aggregation ─────────────────────────────────────────────────────

    /// Fold the states of a component selection: the expected state when
    /// every component reached one of `expected`, the worst observed state
    /// otherwise. Unresolved states are coerced to `RuntimeError`.
    pub fn check_errors(&mut self, expected: &[State], ids: &[String]) -> State {
        let mut worst: Option<State> = None;
        for id in ids {
            let Some(comp) = self.components.get_mut(id) else {
                continue;
            };
            if comp.state().is_none() {
                tracing::warn!(server = %comp.server(), label = %comp.label(), "no state report");
                comp.set_state(Some(State::RuntimeError));
            }
            let state = comp.state().unwrap_or(State::RuntimeError);
            if !expected.contains(&state) {
                worst = worst.max(Some(state));
            }
        }
        worst
            .or_else(|| expected.first().copied())
            .unwrap_or(State::RuntimeError)
    }

    // ── operation plumbing ──────────────────────────────────────────────

    /// Resolve the component selection of one operation.
    fn selection(&self, comps: Option<Vec<String>>, op: &str) -> Vec<String> {
        match comps {
            Some(ids) => ids
                .into_iter()
                .filter(|id| {
                    self.components
                        .get(id)
                        .map(|c| c.enabled() && !c.is_external() && c.supports(op))
                        .unwrap_or(false)
                })
                .collect(),
            None => self.components.managed(Some(op)),
        }
    }

    fn local_op_action(&self, id: &str, op: &str, opts: &OpOptions) -> Option<Box<dyn LocalAction>> {
        let comp = self.components.get(id)?;
        match comp {
            Component::Target(_) => Some(Box::new(TargetAction::new(
                id,
                TargetOp::parse(op)?,
                opts.clone(),
            ))),
            Component::Client(_) => Some(Box::new(ClientAction::new(
                id,
                ClientOp::parse(op)?,
                opts.clone(),
            ))),
            Component::Router(_) => Some(Box::new(RouterAction::new(id, RouterOp::parse(op)?))),
        }
    }

    /// Add a proxy action for one distant server to a batch. Marks every
    /// selected component with a running `proxy` action so distant events
    /// surface on the local handler.
    fn push_proxy(
        &mut self,
        batch: &mut ActionBatch,
        op: &str,
        server: &Server,
        srv_ids: Option<Vec<String>>,
        opts: &OpOptions,
    ) {
        let labels = srv_ids.as_ref().map(|ids| self.components.labels(ids));
        let cmd = ProxyAction::command(self, op, labels.as_deref(), opts);
        if let Some(ids) = &srv_ids {
            for id in ids {
                self.comp_action_start(id, "proxy");
            }
        }
        batch.push(
            Vec::new(),
            ActionKind::Shell {
                cmd,
                nodes: NodeSet::single(server.hostname.clone()),
                fanout: None,
                handler: Box::new(ProxyAction::new(op, srv_ids)),
            },
        );
    }

    /// Build one single-phase batch for `op`, with optional module
    /// load/unload discipline on the local server.
    fn simple_batch(
        &mut self,
        ids: &[String],
        op: &str,
        opts: &OpOptions,
        modules: ModuleEdge,
    ) -> ActionBatch {
        let mut batch = ActionBatch::new();
        for (server, srv_ids) in self.components.by_server(ids) {
            if server.is_local() {
                match modules {
                    ModuleEdge::None => {
                        for id in srv_ids {
                            if let Some(action) = self.local_op_action(&id, op, opts) {
                                batch.push(Vec::new(), ActionKind::Local(action));
                            }
                        }
                    }
                    ModuleEdge::LoadFirst => {
                        let modprobe =
                            batch.push(Vec::new(), ActionKind::Local(Box::new(LoadModules)));
                        for id in srv_ids {
                            if let Some(action) = self.local_op_action(&id, op, opts) {
                                batch.push(vec![modprobe], ActionKind::Local(action));
                            }
                        }
                    }
                    ModuleEdge::UnloadLast => {
                        let mut members: Vec<ActionId> = Vec::new();
                        for id in srv_ids {
                            if let Some(action) = self.local_op_action(&id, op, opts) {
                                members.push(batch.push(Vec::new(), ActionKind::Local(action)));
                            }
                        }
                        if !members.is_empty() {
                            batch.push(members, ActionKind::Local(Box::new(UnloadModules)));
                        }
                    }
                }
            } else {
                self.push_proxy(&mut batch, op, &server, Some(srv_ids), opts);
            }
        }
        batch
    }

    // ── operations ──────────────────────────────────────────────────────

    /// Probe every supporting component. Any state is acceptable input; the
    /// aggregate compares against `Mounted`.
    pub async fn status<T: RemoteShell>(
        &mut self,
        shell: &T,
        comps: Option<Vec<String>>,
        opts: &OpOptions,
    ) -> Result<State, FsError> {
        let ids = self.selection(comps, "status");
        let batch = self.simple_batch(&ids, "status", opts, ModuleEdge::None);
        run_batch(self, shell, batch).await;
        Ok(self.check_errors(&[State::Mounted], &ids))
    }

    /// Format every supporting target. Requires them stopped.
    pub async fn format<T: RemoteShell>(
        &mut self,
        shell: &T,
        comps: Option<Vec<String>>,
        opts: &OpOptions,
    ) -> Result<State, FsError> {
        let ids = self.selection(comps, "format");
        let batch = self.simple_batch(&ids, "format", opts, ModuleEdge::None);
        run_batch(self, shell, batch).await;
        Ok(self.check_errors(&[State::Offline], &ids))
    }

    /// Re-tune the on-disk configuration of every supporting target.
    pub async fn tunefs<T: RemoteShell>(
        &mut self,
        shell: &T,
        comps: Option<Vec<String>>,
        opts: &OpOptions,
    ) -> Result<State, FsError> {
        let ids = self.selection(comps, "tunefs");
        let batch = self.simple_batch(&ids, "tunefs", opts, ModuleEdge::None);
        run_batch(self, shell, batch).await;
        Ok(self.check_errors(&[State::Offline], &ids))
    }

    /// Check the backing file system of every supporting target.
    pub async fn fsck<T: RemoteShell>(
        &mut self,
        shell: &T,
        comps: Option<Vec<String>>,
        opts: &OpOptions,
    ) -> Result<State, FsError> {
        let ids = self.selection(comps, "fsck");
        let batch = self.simple_batch(&ids, "fsck", opts, ModuleEdge::None);
        run_batch(self, shell, batch).await;
        Ok(self.check_errors(&[State::Offline], &ids))
    }

    /// Start the file system servers, phase by phase.
    ///
    /// A metadata target carrying the first-time or writeconf flag swaps
    /// the metadata and object-storage phases for this invocation. A phase
    /// that does not come up stops the sequence: no cascading starts on a
    /// broken foundation.
    pub async fn start<T: RemoteShell>(
        &mut self,
        shell: &T,
        comps: Option<Vec<String>>,
        opts: &OpOptions,
    ) -> Result<State, FsError> {
        let ids = self.selection(comps, "start");

        let mut orders = shine_core::StartOrders::default();
        let mdt_ids: Vec<String> = ids
            .iter()
            .filter(|id| {
                self.components
                    .get(id)
                    .and_then(Component::as_target)
                    .map(|t| t.kind == TargetKind::Mdt)
                    .unwrap_or(false)
            })
            .cloned()
            .collect();
        for id in &mdt_ids {
            // Writeconf pre-check: refresh this target's on-disk flags.
            self.status(shell, Some(vec![id.clone()]), opts).await?;
            let flagged = self
                .components
                .get(id)
                .and_then(Component::as_target)
                .map(|t| t.has_first_time_flag() || t.has_writeconf_flag())
                .unwrap_or(false);
            if flagged {
                orders = shine_core::StartOrders::swapped();
            }
        }

        for (_order, phase) in self.components.by_start_order(&ids, &orders, false) {
            let batch = self.simple_batch(&phase, "start", opts, ModuleEdge::LoadFirst);
            run_batch(self, shell, batch).await;

            let result = self.check_errors(&[State::Mounted, State::Recovering], &phase);
            if !matches!(result, State::Mounted | State::Recovering) {
                return Ok(result);
            }
        }
        Ok(State::Mounted)
    }

    /// Stop the file system servers, phases in reverse start order. Module
    /// unload on a server waits for its local stops.
    pub async fn stop<T: RemoteShell>(
        &mut self,
        shell: &T,
        comps: Option<Vec<String>>,
        opts: &OpOptions,
    ) -> Result<State, FsError> {
        let ids = self.selection(comps, "stop");
        let orders = shine_core::StartOrders::default();

        for (_order, phase) in self.components.by_start_order(&ids, &orders, true) {
            let batch = self.simple_batch(&phase, "stop", opts, ModuleEdge::UnloadLast);
            run_batch(self, shell, batch).await;

            let result = self.check_errors(&[State::Offline], &phase);
            if result != State::Offline {
                return Ok(result);
            }
        }
        Ok(State::Offline)
    }

    /// Mount every supporting client.
    pub async fn mount<T: RemoteShell>(
        &mut self,
        shell: &T,
        comps: Option<Vec<String>>,
        opts: &OpOptions,
    ) -> Result<State, FsError> {
        let ids = self.selection(comps, "mount");
        let batch = self.simple_batch(&ids, "mount", opts, ModuleEdge::LoadFirst);
        run_batch(self, shell, batch).await;
        Ok(self.check_errors(&[State::Mounted], &ids))
    }

    /// Unmount every supporting client; modules unload once the clients on
    /// a server are off.
    pub async fn umount<T: RemoteShell>(
        &mut self,
        shell: &T,
        comps: Option<Vec<String>>,
        opts: &OpOptions,
    ) -> Result<State, FsError> {
        let ids = self.selection(comps, "umount");
        let batch = self.simple_batch(&ids, "umount", opts, ModuleEdge::UnloadLast);
        run_batch(self, shell, batch).await;
        Ok(self.check_errors(&[State::Offline], &ids))
    }

    /// Run a caller command on every supporting component's server. The
    /// command is carried in `opts.addopts`.
    pub async fn execute<T: RemoteShell>(
        &mut self,
        shell: &T,
        comps: Option<Vec<String>>,
        opts: &OpOptions,
    ) -> Result<State, FsError> {
        let ids = self.selection(comps, "execute");
        let command = opts.addopts.clone().unwrap_or_default();

        let mut batch = ActionBatch::new();
        for (server, srv_ids) in self.components.by_server(&ids) {
            if server.is_local() {
                for id in srv_ids {
                    batch.push(
                        Vec::new(),
                        ActionKind::Local(Box::new(ExecuteAction {
                            id,
                            command: command.clone(),
                        })),
                    );
                }
            } else {
                self.push_proxy(&mut batch, "execute", &server, Some(srv_ids), opts);
            }
        }
        run_batch(self, shell, batch).await;
        Ok(self.check_errors(&[State::Mounted], &ids))
    }

    /// Apply the tuning model on every candidate server.
    pub async fn tune<T: RemoteShell>(
        &mut self,
        shell: &T,
        model: &TuningModel,
        comps: Option<Vec<String>>,
        opts: &OpOptions,
    ) -> Result<State, FsError> {
        let ids = match comps {
            Some(ids) => ids,
            None => self.components.managed(None),
        };

        if let Some(tuning_file) = self.settings.tuning_file.clone() {
            let servers = self.components.servers(&ids);
            self.install_on(shell, &tuning_file, &servers).await?;
        }

        let mut batch = ActionBatch::new();
        for (server, srv_ids) in self.components.by_server(&ids) {
            if server.is_local() {
                let profiles: BTreeSet<String> = srv_ids
                    .iter()
                    .filter_map(|id| self.components.get(id))
                    .map(|c| c.tuning_profile().to_string())
                    .collect();
                batch.push(
                    Vec::new(),
                    ActionKind::Local(Box::new(ApplyTuning {
                        profiles,
                        model: model.clone(),
                    })),
                );
            } else {
                self.push_proxy(&mut batch, "tune", &server, Some(srv_ids), opts);
            }
        }
        run_batch(self, shell, batch).await;

        if self.proxy_errors.is_empty() {
            Ok(State::Mounted)
        } else {
            Ok(State::RuntimeError)
        }
    }

    /// Push the file system configuration file onto every server that may
    /// host a component.
    pub async fn install<T: RemoteShell>(
        &mut self,
        shell: &T,
        config_file: &std::path::Path,
    ) -> Result<(), FsError> {
        let ids = self.components.managed(None);
        let servers = self.components.allservers(&ids);
        self.install_on(shell, config_file, &servers).await
    }

    async fn install_on<T: RemoteShell>(
        &mut self,
        shell: &T,
        file: &std::path::Path,
        servers: &NodeSet,
    ) -> Result<(), FsError> {
        let distant = Server::distant_servers(servers);
        if distant.is_empty() {
            return Ok(());
        }

        let mut batch = ActionBatch::new();
        batch.push(
            Vec::new(),
            ActionKind::Copy {
                source: file.to_path_buf(),
                dest: file.to_path_buf(),
                nodes: distant,
                handler: Box::new(InstallHandler {
                    description: format!("install of {}", file.display()),
                }),
            },
        );
        let result = run_batch(self, shell, batch).await;
        match result.errors.into_iter().next() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Remove the per-file-system configuration file everywhere.
    pub async fn remove<T: RemoteShell>(&mut self, shell: &T) -> Result<State, FsError> {
        let ids = self.components.managed(None);
        let servers = self.components.allservers(&ids);
        let distant = Server::distant_servers(&servers);

        if distant.len() < servers.len() {
            let path = self.settings.fs_conf_file(&self.fs_name);
            if path.exists() {
                std::fs::remove_file(&path).map_err(|source| FsError::Io { path, source })?;
            }
        }

        if !distant.is_empty() {
            let mut batch = ActionBatch::new();
            for node in distant.iter() {
                let server = Server::with_default_nid(node);
                self.push_proxy(&mut batch, "remove", &server, None, &OpOptions::default());
            }
            run_batch(self, shell, batch).await;
        }

        if self.proxy_errors.is_empty() {
            Ok(State::Offline)
        } else {
            Ok(State::RuntimeError)
        }
    }
}

/// Module load/unload discipline of a single-phase batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ModuleEdge {
    None,
    /// Kernel modules load before the server's actions start.
    LoadFirst,
    /// Module unload waits for the server's actions to finish.
    UnloadLast,
}

/// Run a caller command on the server of one component.
struct ExecuteAction {
    id: String,
    command: String,
}

#[async_trait::async_trait]
impl LocalAction for ExecuteAction {
    async fn launch(&mut self, fs: &mut FileSystem) -> Launched {
        fs.set_comp_state(&self.id, Some(State::InProgress));
        fs.comp_action_start(&self.id, "execute");
        if self.command.is_empty() {
            fs.comp_action_failed(&self.id, "execute", Some(-1), "no command given".to_string());
            return Launched::Done;
        }
        Launched::Shell {
            cmd: self.command.clone(),
            nodes: NodeSet::single(Server::hostname_short()),
            fanout: None,
            handler: Box::new(ExecuteHandler {
                id: self.id.clone(),
            }),
        }
    }
}

struct ExecuteHandler {
    id: String,
}

impl WorkerHandler for ExecuteHandler {
    fn ev_close(&mut self, fs: &mut FileSystem, report: &WorkerReport) -> Result<(), FsError> {
        if report.did_timeout {
            fs.set_comp_state(&self.id, Some(State::RuntimeError));
            fs.comp_action_timeout(&self.id, "execute");
            return Ok(());
        }

        // Settle the component state with its own probe; the command's exit
        // code decides success.
        match fs.components.get(&self.id).map(Component::compname) {
            Some("target") => {
                let _ = fs.target_lustre_check(&self.id);
            }
            Some("client") => {
                let _ = fs.client_mount_check(&self.id);
            }
            Some("router") => fs.router_status_check(&self.id),
            _ => {}
        }

        let rc = report.max_retcode().unwrap_or(-1);
        if rc == 0 {
            fs.comp_action_done(&self.id, "execute");
        } else {
            fs.comp_action_failed(
                &self.id,
                "execute",
                Some(rc),
                format!("execute failed (rc={rc})"),
            );
        }
        Ok(())
    }
}

#[cfg(test)]
#[path = "fs_tests.rs"]
mod tests;
