#![forbid(unsafe_code)]

//! Host-driven panel controller.
//!
//! The JS host owns the page. It forwards normalized [`HostEvent`]s to
//! [`PerchController::handle`], advances time with
//! [`PerchController::advance`], and applies whatever the controller wrote
//! through [`DocumentMut`] plus the queued [`HostCommand`]s.
//!
//! # Deferred work
//!
//! Browser code leans on `setTimeout(.., 0)` to read the selection after it
//! has settled and to measure a toolbar after its first paint. Here every such
//! step is a [`Deferred`] task on a [`TimerQueue`] driven by a
//! [`DeterministicClock`]. Panel-scoped tasks are owned by their panel and
//! cancelled together when it closes, so a stale task never touches a
//! removed container.
//!
//! # Toolbars
//!
//! At most one *current* selection toolbar exists. A toolbar container keeps
//! [`TOOLBAR_CONTAINER_CLASS`] until it is docked; only containers with that
//! class are removed by outside clicks, typing, or a newer selection.

use std::collections::BTreeMap;
use std::fmt;

use perch_core::editable::{CHAT_BOX_POPUP_TEXTAREA, EVENT_DENYLIST, is_denylisted};
use perch_core::{
    ContainerStyle, CssPosition, DocumentMut, DocumentTree, HostEvent, KeyEvent, NodeId,
    PointerButton, PointerEvent, Position, TouchEvent, element_position, find_editable_ancestor,
};
use perch_layout::placement::{POINTER_TOOLBAR_GAP_Y, TOUCH_TOOLBAR_OFFSET};
use perch_layout::{
    Anchor, DragEffect, centered_menu_position, conversation_grow_position, ensure_visibility,
    keyboard_toolbar_position, static_card_position, tool_expand_position, toolbar_left,
};
use perch_runtime::{AnswerSource, DeterministicClock, KeyValueStore, Session, TimerId, TimerQueue, UserConfig};
use perch_widgets::reply::nonblank;
use perch_widgets::{
    CARD_CONTAINER_CLASS, DOCKED_CONTAINER_CLASS, HoverRegion, ModelCatalog, OverlayKind,
    OverlayTransition, Panel, PanelError, PanelId, PanelOrigin, PortalRegistry, ReplyKind,
    ReplyProfile, TOOLBAR_CONTAINER_CLASS, Template, TemplateBook, ToolRegistry, ToolRow,
    customization_prompt, reply_prompt,
};
use web_time::Duration;

use crate::command::HostCommand;
use crate::menu::ContextMenuCommand;
use crate::pointer_capture::{CaptureDispatch, DragCaptureAdapter};
use crate::tracker::{InteractionContext, normalize_selection};

/// Wait after `Ctrl+A` / `Shift+Arrow` before reading the selection.
pub const KEYBOARD_SETTLE_DELAY: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, Copy, PartialEq)]
enum Deferred {
    /// Pointer-up: open a toolbar once the selection has settled.
    PointerToolbar {
        pointer: Position,
        end_container: Option<NodeId>,
    },
    /// Touch-end: open a toolbar at a position fixed at event time.
    TouchToolbar { at: Position },
    /// Keyboard selection: confirm the selection lives in an editable.
    KeyboardSettle,
    /// Keyboard selection: open the toolbar next to the focused input.
    KeyboardToolbar,
    /// Typing elsewhere: drop the toolbar if nothing is selected any more.
    TypingCheck,
    /// First paint: pull the toolbar back from the right window edge.
    ClampToolbarLeft(PanelId),
    HoverDismiss(PanelId, HoverRegion),
}

/// Owns every open panel on one page.
pub struct PerchController {
    config: UserConfig,
    clock: DeterministicClock,
    timers: TimerQueue<Deferred>,
    context: InteractionContext,
    panels: BTreeMap<PanelId, Panel>,
    portals: PortalRegistry,
    tools: ToolRegistry,
    models: ModelCatalog,
    templates: TemplateBook,
    store: Box<dyn KeyValueStore>,
    answers: Box<dyn AnswerSource>,
    capture: DragCaptureAdapter,
    reply_profile: Option<ReplyProfile>,
    commands: Vec<HostCommand>,
    next_panel_id: u64,
}

impl fmt::Debug for PerchController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PerchController")
            .field("now", &self.clock.now())
            .field("panels", &self.panels.len())
            .field("toolbar", &self.context.toolbar())
            .field("pending_timers", &self.timers.len())
            .field("queued_commands", &self.commands.len())
            .finish_non_exhaustive()
    }
}

impl PerchController {
    /// Create a controller and load saved templates from `store`.
    pub fn new(
        config: UserConfig,
        answers: Box<dyn AnswerSource>,
        store: Box<dyn KeyValueStore>,
    ) -> Result<Self, PanelError> {
        let templates = TemplateBook::load(store.as_ref())?;
        let tools = ToolRegistry::builtin(config.preferred_language());
        Ok(Self {
            config,
            clock: DeterministicClock::new(),
            timers: TimerQueue::new(),
            context: InteractionContext::new(),
            panels: BTreeMap::new(),
            portals: PortalRegistry::new(),
            tools,
            models: ModelCatalog::builtin(),
            templates,
            store,
            answers,
            capture: DragCaptureAdapter::default(),
            reply_profile: None,
            commands: Vec::new(),
            next_panel_id: 1,
        })
    }

    #[must_use]
    pub fn with_tools(mut self, tools: ToolRegistry) -> Self {
        self.tools = tools;
        self
    }

    #[must_use]
    pub fn with_models(mut self, models: ModelCatalog) -> Self {
        self.models = models;
        self
    }

    #[must_use]
    pub fn with_reply_profile(mut self, profile: ReplyProfile) -> Self {
        self.reply_profile = Some(profile);
        self
    }

    #[must_use]
    pub fn with_capture(mut self, capture: DragCaptureAdapter) -> Self {
        self.capture = capture;
        self
    }

    // --- queries -------------------------------------------------------------

    pub fn config(&self) -> &UserConfig {
        &self.config
    }

    #[must_use]
    pub fn now(&self) -> Duration {
        self.clock.now()
    }

    pub fn context(&self) -> &InteractionContext {
        &self.context
    }

    pub fn capture(&self) -> &DragCaptureAdapter {
        &self.capture
    }

    pub fn panel(&self, id: PanelId) -> Option<&Panel> {
        self.panels.get(&id)
    }

    /// Mutable access for host-side edits (ask text, reply context).
    pub fn panel_mut(&mut self, id: PanelId) -> Option<&mut Panel> {
        self.panels.get_mut(&id)
    }

    pub fn panels(&self) -> impl Iterator<Item = &Panel> {
        self.panels.values()
    }

    /// The current selection toolbar, if it is still open.
    #[must_use]
    pub fn toolbar(&self) -> Option<PanelId> {
        self.context
            .toolbar()
            .filter(|id| self.panels.contains_key(id))
    }

    /// Active tools split into the inline row and the hidden-tools flyout.
    pub fn tool_row(&self) -> ToolRow {
        self.tools.row(
            &self.config.active_selection_tools,
            self.config.max_visible_tools,
        )
    }

    pub fn templates(&self) -> &[Template] {
        self.templates.templates()
    }

    /// Earliest pending deadline, for hosts that sleep between ticks.
    #[must_use]
    pub fn next_deadline(&self) -> Option<Duration> {
        self.timers.next_due()
    }

    #[must_use]
    pub fn pending_tasks(&self) -> usize {
        self.timers.len()
    }

    /// Take every command queued since the last drain.
    pub fn drain_commands(&mut self) -> Vec<HostCommand> {
        std::mem::take(&mut self.commands)
    }

    // --- host events ---------------------------------------------------------

    /// Dispatch one page-level event.
    pub fn handle<D: DocumentMut + ?Sized>(&mut self, doc: &mut D, event: HostEvent) {
        let _span = tracing::debug_span!("perch.handle", event = event.name()).entered();
        match event {
            HostEvent::PointerUp(ev) => self.on_pointer_up(doc, ev),
            HostEvent::PointerDown(ev) => self.on_pointer_down(doc, ev),
            HostEvent::KeyDown(ev) => self.on_key_down(doc, ev),
            HostEvent::TouchStart(ev) => self.on_touch_start(doc, ev),
            HostEvent::TouchEnd(ev) => self.on_touch_end(doc, ev),
            HostEvent::SelectionChange => self.on_selection_change(doc),
            HostEvent::ContextMenu(ev) => self.context.set_menu_position(ev.client),
        }
    }

    /// Advance the clock by `dt` and run everything that became due.
    pub fn advance<D: DocumentMut + ?Sized>(&mut self, doc: &mut D, dt: Duration) -> usize {
        let now = self.clock.now() + dt;
        self.tick(doc, now)
    }

    /// Move the clock to `now` and run every task due by then, including
    /// zero-delay work scheduled by earlier tasks. Streams are pumped after.
    ///
    /// Returns the number of tasks run.
    pub fn tick<D: DocumentMut + ?Sized>(&mut self, doc: &mut D, now: Duration) -> usize {
        self.clock.set(now);
        self.prune_detached(doc);
        let mut ran = 0;
        while let Some((id, task)) = self.timers.pop_due(self.clock.now()) {
            self.run_deferred(doc, id, task);
            ran += 1;
        }
        for panel in self.panels.values_mut() {
            panel.conversation_mut().pump();
        }
        ran
    }

    fn on_pointer_up<D: DocumentMut + ?Sized>(&mut self, doc: &mut D, ev: PointerEvent) {
        if is_denylisted(doc, ev.target, EVENT_DENYLIST) {
            return;
        }
        let selection = doc.selection();
        if !selection.is_empty() && find_editable_ancestor(doc, ev.target).is_some() {
            self.context.set_focused_input(ev.target);
        }
        if self.inside_toolbar(doc, ev.target) {
            return;
        }
        if let Some(end) = selection.end_container
            && self.inside_toolbar(doc, end)
        {
            return;
        }
        self.remove_toolbar(doc);
        self.defer(Deferred::PointerToolbar {
            pointer: ev.page,
            end_container: selection.end_container,
        });
    }

    fn on_pointer_down<D: DocumentMut + ?Sized>(&mut self, doc: &mut D, ev: PointerEvent) {
        // Focus is cleared before any dismissal decision.
        self.context.clear_focused_input();
        if self.inside_toolbar(doc, ev.target) {
            return;
        }
        if self.current_toolbar().is_some_and(Panel::is_docked) {
            return;
        }
        self.remove_toolbar_mode_panels(doc, "outside_click");
    }

    fn on_key_down<D: DocumentMut + ?Sized>(&mut self, doc: &mut D, ev: KeyEvent) {
        if self.submit_from_popup(doc, ev) {
            return;
        }
        if is_denylisted(doc, ev.target, EVENT_DENYLIST) {
            return;
        }
        if let Some(toolbar) = self.current_toolbar()
            && !doc.contains(toolbar.container(), ev.target)
            && find_editable_ancestor(doc, ev.target).is_some()
        {
            self.defer(Deferred::TypingCheck);
        }
        if ev.is_selection_shortcut() {
            self.remove_toolbar(doc);
            self.timers.schedule(
                self.clock.now(),
                KEYBOARD_SETTLE_DELAY,
                Deferred::KeyboardSettle,
            );
        }
    }

    fn on_touch_end<D: DocumentMut + ?Sized>(&mut self, doc: &mut D, ev: TouchEvent) {
        if self.inside_toolbar(doc, ev.target) {
            return;
        }
        let selection = doc.selection();
        if let Some(end) = selection.end_container
            && self.inside_toolbar(doc, end)
        {
            return;
        }
        self.remove_toolbar(doc);
        self.defer(Deferred::TouchToolbar {
            at: ev.page + TOUCH_TOOLBAR_OFFSET,
        });
    }

    fn on_touch_start<D: DocumentMut + ?Sized>(&mut self, doc: &mut D, ev: TouchEvent) {
        if self.inside_toolbar(doc, ev.target) {
            return;
        }
        self.remove_toolbar_mode_panels(doc, "touch_outside");
    }

    /// Touch selections keep growing after the toolbar opened; an untriggered
    /// toolbar follows them.
    fn on_selection_change<D: DocumentTree + ?Sized>(&mut self, doc: &D) {
        let selection = doc.selection();
        self.context.set_touch_selection(&selection.text);
        let text = normalize_selection(&selection.text);
        if text.is_empty() {
            return;
        }
        if let Some(id) = self.context.toolbar()
            && let Some(panel) = self.panels.get_mut(&id)
            && !panel.is_triggered()
        {
            panel.set_selection(text);
        }
    }

    /// `Shift/Ctrl/Cmd+Enter` in a popup textarea sends the ask or reply.
    fn submit_from_popup<D: DocumentMut + ?Sized>(&mut self, doc: &mut D, ev: KeyEvent) -> bool {
        if !ev.is_submit_chord() || !doc.has_class(ev.target, CHAT_BOX_POPUP_TEXTAREA) {
            return false;
        }
        let Some((id, active)) = self
            .panels
            .values()
            .find(|p| doc.contains(p.container(), ev.target))
            .map(|p| (p.id(), p.overlay.active()))
        else {
            return false;
        };
        let result = match active {
            Some(OverlayKind::AskInput) => self.ask_send(doc, id),
            Some(OverlayKind::ReplyContext) => self.execute_reply(doc, id).map(|_| ()),
            _ => return false,
        };
        if let Err(error) = result {
            tracing::warn!(message = "panel.submit_failed", panel = id.get(), %error);
        }
        true
    }

    // --- deferred work -------------------------------------------------------

    fn defer(&mut self, task: Deferred) -> TimerId {
        self.timers.schedule(self.clock.now(), Duration::ZERO, task)
    }

    fn run_deferred<D: DocumentMut + ?Sized>(&mut self, doc: &mut D, id: TimerId, task: Deferred) {
        match task {
            Deferred::PointerToolbar {
                pointer,
                end_container,
            } => {
                let Some(selection) = settled_selection(doc) else {
                    return;
                };
                let mut anchor = Anchor::Pointer(pointer);
                if self.config.selection_tools_next_to_input_box
                    && let Some(node) = end_container
                    && find_editable_ancestor(doc, node).is_some()
                {
                    anchor = Anchor::Element(doc.bounding_rect(node));
                }
                let at = anchor
                    .page_position(doc.metrics().scroll)
                    .offset(0.0, POINTER_TOOLBAR_GAP_Y);
                self.open_toolbar(doc, at, selection);
            }
            Deferred::TouchToolbar { at } => {
                if let Some(selection) = settled_selection(doc) {
                    self.open_toolbar(doc, at, selection);
                }
            }
            Deferred::KeyboardSettle => {
                if doc.selection().is_empty() {
                    return;
                }
                let Some(active) = doc.active_element() else {
                    return;
                };
                if find_editable_ancestor(doc, active).is_none() {
                    return;
                }
                self.context.set_focused_input(active);
                self.defer(Deferred::KeyboardToolbar);
            }
            Deferred::KeyboardToolbar => {
                let Some(input) = self.context.focused_input() else {
                    return;
                };
                let Some(selection) = settled_selection(doc) else {
                    return;
                };
                let input_page =
                    element_position(doc.bounding_rect(input), doc.metrics().scroll, true);
                let at = keyboard_toolbar_position(input_page, doc.offset_width(input));
                self.open_toolbar(doc, at, selection);
            }
            Deferred::TypingCheck => {
                if doc.selection().text.trim().is_empty() {
                    self.remove_toolbar(doc);
                }
            }
            Deferred::ClampToolbarLeft(panel) => self.clamp_toolbar_left(doc, panel),
            Deferred::HoverDismiss(panel_id, region) => {
                let Some(panel) = self.panels.get_mut(&panel_id) else {
                    return;
                };
                let intent = match region {
                    HoverRegion::HiddenTools => &mut panel.hidden_tools_hover,
                    HoverRegion::Reply => &mut panel.reply_hover,
                };
                if !intent.fire(id) {
                    return;
                }
                let hid_before = panel.overlay.hides_tool_row();
                for &kind in region.dismisses() {
                    if let Some(transition) = panel.overlay.close(kind) {
                        overlay_effects(&mut self.commands, panel, transition, hid_before);
                    }
                }
            }
        }
    }

    fn clamp_toolbar_left<D: DocumentMut + ?Sized>(&mut self, doc: &mut D, id: PanelId) {
        let Some(panel) = self.panels.get_mut(&id) else {
            return;
        };
        if !panel.is_triggered() && panel.can_reposition() {
            let x = panel.placement.committed().x;
            let left = toolbar_left(
                x,
                doc.metrics().viewport_width,
                doc.offset_width(panel.container()),
            );
            if left != x {
                panel.placement.set_left(left);
                doc.set_container_style(panel.container(), panel.container_style());
                tracing::debug!(message = "panel.toolbar_left", panel = id.get(), from = x, to = left);
            }
        }
        panel.placement.settle();
    }

    // --- mounting ------------------------------------------------------------

    fn allocate_id(&mut self) -> PanelId {
        let id = PanelId::new(self.next_panel_id);
        self.next_panel_id = self.next_panel_id.saturating_add(1);
        id
    }

    fn new_panel(&self, id: PanelId, container: NodeId, origin: PanelOrigin, selection: &str) -> Panel {
        let model = self.config.model_name.as_str();
        let session = Session::new(model, self.models.display_name(model));
        Panel::new(
            id,
            container,
            origin,
            selection,
            session,
            self.config.hover_dismiss_delay(),
        )
    }

    fn insert_panel(&mut self, panel: Panel) -> PanelId {
        let id = panel.id();
        self.commands.push(HostCommand::PanelMounted {
            panel: id,
            container: panel.container(),
        });
        tracing::debug!(
            message = "panel.mount",
            panel = id.get(),
            origin = ?panel.origin(),
            x = panel.placement.committed().x,
            y = panel.placement.committed().y
        );
        self.panels.insert(id, panel);
        id
    }

    /// Open a selection toolbar near `at`, replacing the current one.
    fn open_toolbar<D: DocumentMut + ?Sized>(
        &mut self,
        doc: &mut D,
        at: Position,
        selection: String,
    ) -> PanelId {
        self.remove_toolbar(doc);
        let metrics = doc.metrics();
        let clamped = ensure_visibility(at, &metrics);
        let container = doc.create_container(TOOLBAR_CONTAINER_CLASS, ContainerStyle::absolute(clamped));
        let id = self.allocate_id();
        let mut panel = self.new_panel(id, container, PanelOrigin::Selection, &selection);
        panel.placement.mount(at, &metrics);
        self.insert_panel(panel);
        self.context.set_toolbar(id);
        self.timers.schedule_owned(
            id.get(),
            self.clock.now(),
            Duration::ZERO,
            Deferred::ClampToolbarLeft(id),
        );
        id
    }

    /// Mount the site card: triggered, closeable and dockable from the start.
    /// Any previous card is replaced.
    pub fn mount_static_card<D: DocumentMut + ?Sized>(
        &mut self,
        doc: &mut D,
        question: Option<&str>,
    ) -> PanelId {
        let previous: Vec<PanelId> = self
            .panels
            .values()
            .filter(|p| p.origin() == PanelOrigin::StaticCard)
            .map(Panel::id)
            .collect();
        for id in previous {
            self.close(doc, id);
        }

        let metrics = doc.metrics();
        let at = ensure_visibility(static_card_position(&metrics), &metrics);
        let container = doc.create_container(CARD_CONTAINER_CLASS, ContainerStyle::absolute(at));
        let id = self.allocate_id();
        let mut panel = self.new_panel(id, container, PanelOrigin::StaticCard, question.unwrap_or_default());
        panel.placement.mount(at, &metrics);
        panel.placement.settle();
        panel.set_closeable();
        panel.trigger(self.answers.as_mut(), question.filter(|q| !q.is_empty()));
        self.insert_panel(panel);
        self.after_trigger(doc, id);
        id
    }

    /// Open a docked chat panel for a context-menu item.
    ///
    /// Returns `Ok(None)` for a menu tool without a prompt.
    pub fn context_menu_command<D: DocumentMut + ?Sized>(
        &mut self,
        doc: &mut D,
        command: &ContextMenuCommand,
    ) -> Result<Option<PanelId>, PanelError> {
        let prompt = if let Some(tool) = self.tools.get(&command.item_id) {
            tool.gen_prompt(&command.selection_text)
        } else if let Some(menu) = self.tools.menu_tool(&command.item_id) {
            let Some(prompt) = menu.gen_prompt() else {
                return Ok(None);
            };
            if prompt.is_empty() {
                prompt
            } else {
                format!("Reply in {}.\n{prompt}", self.config.preferred_language())
            }
        } else {
            return Err(PanelError::UnknownTool(command.item_id.clone()));
        };

        let metrics = doc.metrics();
        let anchor = command
            .use_menu_position
            .then(|| self.context.menu_position())
            .flatten()
            .unwrap_or_else(|| centered_menu_position(&metrics));
        let at = ensure_visibility(anchor, &metrics);
        let container = doc.create_container(DOCKED_CONTAINER_CLASS, ContainerStyle::absolute(at));
        let id = self.allocate_id();
        let mut panel = self.new_panel(id, container, PanelOrigin::ContextMenu, &command.selection_text);
        panel.placement.mount(at, &metrics);
        panel.placement.settle();
        panel.dock();
        panel.trigger(self.answers.as_mut(), Some(prompt.as_str()).filter(|p| !p.is_empty()));
        self.insert_panel(panel);
        Ok(Some(id))
    }

    // --- panel actions -------------------------------------------------------

    /// Run selection tool `key` on the panel's selection.
    pub fn tool_click<D: DocumentMut + ?Sized>(
        &mut self,
        doc: &mut D,
        id: PanelId,
        key: &str,
    ) -> Result<(), PanelError> {
        let panel = self.panels.get_mut(&id).ok_or(PanelError::UnknownPanel(id))?;
        let prompt = self.tools.gen_prompt(key, panel.selection())?;
        let metrics = doc.metrics();
        let client = element_position(doc.bounding_rect(panel.container()), metrics.scroll, false);
        panel.placement.relocate(tool_expand_position(client), &metrics);
        panel.set_css_position(CssPosition::Fixed);
        let hid_before = panel.overlay.hides_tool_row();
        panel.trigger(self.answers.as_mut(), Some(&prompt));
        doc.set_container_style(panel.container(), panel.container_style());
        panel.placement.settle();
        if hid_before {
            self.commands.push(HostCommand::ToolRowVisibility {
                panel: id,
                visible: true,
            });
        }
        tracing::debug!(message = "panel.tool_click", panel = id.get(), tool = key);
        self.after_trigger(doc, id);
        Ok(())
    }

    /// Send the ask popup. Copies the question when the selection is included.
    pub fn ask_send<D: DocumentMut + ?Sized>(
        &mut self,
        doc: &mut D,
        id: PanelId,
    ) -> Result<(), PanelError> {
        let panel = self.panels.get_mut(&id).ok_or(PanelError::UnknownPanel(id))?;
        let selection = panel.selection().to_owned();
        let outcome = panel.ask.take_prompt(&selection);
        if let Some(text) = outcome.clipboard {
            self.commands.push(HostCommand::CopyToClipboard { text });
        }
        self.grow_and_trigger(doc, id, &outcome.prompt)
    }

    /// Reply options -> reply context for `kind`.
    pub fn choose_reply(&mut self, id: PanelId, kind: ReplyKind) -> Result<(), PanelError> {
        let panel = self.panels.get_mut(&id).ok_or(PanelError::UnknownPanel(id))?;
        let hid_before = panel.overlay.hides_tool_row();
        let transition = panel.overlay.choose_reply(kind);
        overlay_effects(&mut self.commands, panel, transition, hid_before);
        Ok(())
    }

    /// Send the reply chosen in the reply options.
    ///
    /// Returns `Ok(false)` when no reply kind has been chosen.
    pub fn execute_reply<D: DocumentMut + ?Sized>(
        &mut self,
        doc: &mut D,
        id: PanelId,
    ) -> Result<bool, PanelError> {
        let panel = self.panels.get_mut(&id).ok_or(PanelError::UnknownPanel(id))?;
        let Some(kind) = panel.overlay.reply_kind() else {
            return Ok(false);
        };
        let prompt = reply_prompt(
            kind,
            panel.selection(),
            &panel.reply_context,
            self.reply_profile.as_ref(),
        );
        if let Some(context) = nonblank(&panel.reply_context) {
            self.commands.push(HostCommand::CopyToClipboard {
                text: context.to_owned(),
            });
        }
        self.grow_and_trigger(doc, id, &prompt)?;
        Ok(true)
    }

    /// Show `kind` (closing siblings) or close everything with `None`.
    pub fn set_overlay(
        &mut self,
        id: PanelId,
        kind: Option<OverlayKind>,
    ) -> Result<OverlayTransition, PanelError> {
        let panel = self.panels.get_mut(&id).ok_or(PanelError::UnknownPanel(id))?;
        let hid_before = panel.overlay.hides_tool_row();
        let transition = panel.overlay.set_active(kind);
        overlay_effects(&mut self.commands, panel, transition, hid_before);
        Ok(transition)
    }

    /// Ask and model buttons: open, or close when already open.
    pub fn toggle_overlay(
        &mut self,
        id: PanelId,
        kind: OverlayKind,
    ) -> Result<OverlayTransition, PanelError> {
        let panel = self.panels.get_mut(&id).ok_or(PanelError::UnknownPanel(id))?;
        let hid_before = panel.overlay.hides_tool_row();
        let transition = panel.overlay.toggle(kind);
        overlay_effects(&mut self.commands, panel, transition, hid_before);
        Ok(transition)
    }

    pub fn hover_enter(&mut self, id: PanelId, region: HoverRegion) -> Result<(), PanelError> {
        let panel = self.panels.get_mut(&id).ok_or(PanelError::UnknownPanel(id))?;
        match region {
            HoverRegion::HiddenTools => panel.hidden_tools_hover.enter(&mut self.timers),
            HoverRegion::Reply => panel.reply_hover.enter(&mut self.timers),
        };
        let hid_before = panel.overlay.hides_tool_row();
        let transition = match region {
            HoverRegion::HiddenTools => panel.overlay.hover_hidden_tools(),
            HoverRegion::Reply => panel.overlay.hover_reply(),
        };
        if let Some(transition) = transition {
            overlay_effects(&mut self.commands, panel, transition, hid_before);
        }
        Ok(())
    }

    pub fn hover_leave(&mut self, id: PanelId, region: HoverRegion) -> Result<(), PanelError> {
        let panel = self.panels.get_mut(&id).ok_or(PanelError::UnknownPanel(id))?;
        let intent = match region {
            HoverRegion::HiddenTools => &mut panel.hidden_tools_hover,
            HoverRegion::Reply => &mut panel.reply_hover,
        };
        intent.leave(
            &mut self.timers,
            id.get(),
            self.clock.now(),
            Deferred::HoverDismiss(id, region),
        );
        Ok(())
    }

    /// Switch the panel's model and close the model popup.
    pub fn select_model(&mut self, id: PanelId, key: &str) -> Result<(), PanelError> {
        let entry = self.models.get(key)?;
        let panel = self.panels.get_mut(&id).ok_or(PanelError::UnknownPanel(id))?;
        panel.conversation_mut().set_model(&entry.key, &entry.desc);
        if let Some(transition) = panel.overlay.close(OverlayKind::ModelSelect) {
            overlay_effects(&mut self.commands, panel, transition, false);
        }
        tracing::debug!(message = "panel.model", panel = id.get(), model = key);
        Ok(())
    }

    /// Save a template from the add form and return to the list.
    pub fn add_template(
        &mut self,
        id: PanelId,
        message: &str,
        placeholder: &str,
    ) -> Result<(), PanelError> {
        self.templates
            .add(self.store.as_mut(), Template::new(message, placeholder))?;
        if self.panels.contains_key(&id) {
            self.set_overlay(id, Some(OverlayKind::TemplateList))?;
        }
        Ok(())
    }

    pub fn delete_template(&mut self, index: usize) -> Result<Template, PanelError> {
        self.templates.delete(self.store.as_mut(), index)
    }

    /// Use template `index`: copy it, then either close the toolbar (no
    /// placeholders) or ask for the placeholders to be filled from the
    /// selection.
    pub fn choose_template<D: DocumentMut + ?Sized>(
        &mut self,
        doc: &mut D,
        id: PanelId,
        index: usize,
    ) -> Result<(), PanelError> {
        let template = self
            .templates
            .get(index)
            .cloned()
            .ok_or(PanelError::TemplateIndex {
                index,
                len: self.templates.templates().len(),
            })?;
        let panel = self.panels.get_mut(&id).ok_or(PanelError::UnknownPanel(id))?;
        self.commands.push(HostCommand::CopyToClipboard {
            text: template.message.clone(),
        });
        let hid_before = panel.overlay.hides_tool_row();
        if let Some(transition) = panel.overlay.close(OverlayKind::TemplateList) {
            overlay_effects(&mut self.commands, panel, transition, hid_before);
        }
        if !template.has_placeholders() {
            if is_toolbar_mode(panel) {
                self.close(doc, id);
            }
            return Ok(());
        }
        let prompt = customization_prompt(&template, panel.selection());
        self.grow_and_trigger(doc, id, &prompt)
    }

    /// Pin the panel. Returns `true` if this call docked it.
    pub fn dock<D: DocumentMut + ?Sized>(
        &mut self,
        doc: &mut D,
        id: PanelId,
    ) -> Result<bool, PanelError> {
        let panel = self.panels.get_mut(&id).ok_or(PanelError::UnknownPanel(id))?;
        let first = panel.dock();
        if first {
            doc.set_class_name(panel.container(), DOCKED_CONTAINER_CLASS);
        }
        Ok(first)
    }

    /// Stop the panel's running answer.
    pub fn stop_answer(&mut self, id: PanelId) -> Result<bool, PanelError> {
        let panel = self.panels.get_mut(&id).ok_or(PanelError::UnknownPanel(id))?;
        Ok(panel.conversation_mut().stop())
    }

    /// Side-handle resize. Returns the applied width.
    pub fn resize(&mut self, id: PanelId, width: f64) -> Result<f64, PanelError> {
        let panel = self.panels.get_mut(&id).ok_or(PanelError::UnknownPanel(id))?;
        Ok(panel.placement.on_resize(width))
    }

    /// Re-clamp the panel against the current page. `Some` when it moved.
    pub fn update_position<D: DocumentMut + ?Sized>(
        &mut self,
        doc: &mut D,
        id: PanelId,
    ) -> Result<Option<Position>, PanelError> {
        let panel = self.panels.get_mut(&id).ok_or(PanelError::UnknownPanel(id))?;
        let moved = panel.placement.update(&doc.metrics());
        if moved.is_some() {
            doc.set_container_style(panel.container(), panel.container_style());
        }
        Ok(moved)
    }

    /// Treat `root` as part of the panel for outside-click checks.
    pub fn register_portal(&mut self, id: PanelId, root: NodeId) -> Result<(), PanelError> {
        if !self.panels.contains_key(&id) {
            return Err(PanelError::UnknownPanel(id));
        }
        self.portals.register(id.get(), root);
        Ok(())
    }

    pub fn unregister_portal(&mut self, root: NodeId) -> bool {
        self.portals.unregister(root)
    }

    /// Remove the panel and everything it owns. Idempotent.
    pub fn close<D: DocumentMut + ?Sized>(&mut self, doc: &mut D, id: PanelId) -> bool {
        let Some(mut panel) = self.panels.remove(&id) else {
            return false;
        };
        panel.conversation_mut().stop();
        let timers = self.timers.cancel_owner(id.get());
        let portals = self.portals.release_owner(id.get());
        if let Some(dispatch) = self.capture.panel_removed(id)
            && let Some(capture) = dispatch.capture_command
        {
            self.commands.push(HostCommand::PointerCapture { capture });
        }
        self.context.clear_toolbar(id);
        doc.remove(panel.container());
        self.commands.push(HostCommand::PanelClosed { panel: id });
        tracing::debug!(message = "panel.close", panel = id.get(), timers, portals);
        true
    }

    // --- drag handle ---------------------------------------------------------

    /// Pointer-down inside a panel. `on_handle` marks the drag handle; the
    /// handle is hidden (and inert) while templates are shown.
    pub fn drag_pointer_down<D: DocumentMut + ?Sized>(
        &mut self,
        doc: &mut D,
        id: PanelId,
        pointer_id: u32,
        button: PointerButton,
        position: Position,
        on_handle: bool,
    ) -> CaptureDispatch {
        let handle_visible = self
            .panels
            .get(&id)
            .is_some_and(|p| !p.overlay.hides_tool_row());
        let dispatch = self.capture.pointer_down(
            id,
            pointer_id,
            button,
            position,
            on_handle && handle_visible,
        );
        self.apply_capture(doc, &dispatch);
        dispatch
    }

    pub fn drag_capture_acquired(&mut self, pointer_id: u32) -> CaptureDispatch {
        self.capture.capture_acquired(pointer_id)
    }

    pub fn drag_move<D: DocumentMut + ?Sized>(
        &mut self,
        doc: &mut D,
        pointer_id: u32,
        position: Position,
    ) -> CaptureDispatch {
        let dispatch = self.capture.pointer_move(pointer_id, position);
        self.apply_capture(doc, &dispatch);
        dispatch
    }

    pub fn drag_up<D: DocumentMut + ?Sized>(
        &mut self,
        doc: &mut D,
        pointer_id: u32,
        button: PointerButton,
        position: Position,
    ) -> CaptureDispatch {
        let dispatch = self.capture.pointer_up(pointer_id, button, position);
        self.apply_capture(doc, &dispatch);
        dispatch
    }

    pub fn drag_cancel<D: DocumentMut + ?Sized>(
        &mut self,
        doc: &mut D,
        pointer_id: Option<u32>,
    ) -> CaptureDispatch {
        let dispatch = self.capture.pointer_cancel(pointer_id);
        self.apply_capture(doc, &dispatch);
        dispatch
    }

    pub fn drag_pointer_leave<D: DocumentMut + ?Sized>(
        &mut self,
        doc: &mut D,
        pointer_id: u32,
    ) -> CaptureDispatch {
        let dispatch = self.capture.pointer_leave(pointer_id);
        self.apply_capture(doc, &dispatch);
        dispatch
    }

    pub fn drag_lost_capture<D: DocumentMut + ?Sized>(
        &mut self,
        doc: &mut D,
        pointer_id: u32,
    ) -> CaptureDispatch {
        let dispatch = self.capture.lost_pointer_capture(pointer_id);
        self.apply_capture(doc, &dispatch);
        dispatch
    }

    /// Window blur interrupts any drag.
    pub fn blur<D: DocumentMut + ?Sized>(&mut self, doc: &mut D) -> CaptureDispatch {
        let dispatch = self.capture.blur();
        self.apply_capture(doc, &dispatch);
        dispatch
    }

    pub fn visibility_hidden<D: DocumentMut + ?Sized>(&mut self, doc: &mut D) -> CaptureDispatch {
        let dispatch = self.capture.visibility_hidden();
        self.apply_capture(doc, &dispatch);
        dispatch
    }

    /// Feed a drag transition into the owning panel's placement.
    fn apply_capture<D: DocumentMut + ?Sized>(&mut self, doc: &mut D, dispatch: &CaptureDispatch) {
        if let Some(capture) = dispatch.capture_command {
            self.commands.push(HostCommand::PointerCapture { capture });
        }
        let (Some(transition), Some(id)) = (dispatch.transition, dispatch.panel()) else {
            return;
        };
        let Some(panel) = self.panels.get_mut(&id) else {
            return;
        };
        match transition.effect {
            DragEffect::DragStarted {
                delta_x, delta_y, ..
            } => {
                panel.placement.begin_drag();
                panel.placement.on_drag_delta(delta_x, delta_y);
            }
            DragEffect::DragUpdated {
                delta_x, delta_y, ..
            } => panel.placement.on_drag_delta(delta_x, delta_y),
            DragEffect::Committed {
                delta_x, delta_y, ..
            } => {
                panel.placement.on_drag_delta(delta_x, delta_y);
                panel.placement.on_drag_end();
            }
            // An interrupted drag keeps where the panel was dragged to.
            DragEffect::Canceled { .. } => {
                panel.placement.on_drag_end();
            }
            DragEffect::Armed { .. } | DragEffect::Noop { .. } => return,
        }
        doc.set_container_style(panel.container(), panel.container_style());
    }

    // --- helpers -------------------------------------------------------------

    fn current_toolbar(&self) -> Option<&Panel> {
        self.context.toolbar().and_then(|id| self.panels.get(&id))
    }

    /// Whether `target` is inside the current toolbar or one of the
    /// registered portals.
    fn inside_toolbar<D: DocumentTree + ?Sized>(&self, doc: &D, target: NodeId) -> bool {
        let Some(toolbar) = self.current_toolbar() else {
            return false;
        };
        doc.contains(toolbar.container(), target) || self.portals.contains(doc, target)
    }

    /// Remove the current toolbar unless it has been docked.
    fn remove_toolbar<D: DocumentMut + ?Sized>(&mut self, doc: &mut D) {
        if let Some(id) = self
            .current_toolbar()
            .filter(|p| is_toolbar_mode(p))
            .map(Panel::id)
        {
            self.close(doc, id);
        }
    }

    fn remove_toolbar_mode_panels<D: DocumentMut + ?Sized>(&mut self, doc: &mut D, reason: &'static str) {
        let ids: Vec<PanelId> = self
            .panels
            .values()
            .filter(|p| is_toolbar_mode(p))
            .map(Panel::id)
            .collect();
        if !ids.is_empty() {
            tracing::debug!(message = "panel.dismiss", reason, count = ids.len());
        }
        for id in ids {
            self.close(doc, id);
        }
    }

    /// Close panels whose container the page removed on its own.
    fn prune_detached<D: DocumentMut + ?Sized>(&mut self, doc: &mut D) {
        let gone: Vec<PanelId> = self
            .panels
            .values()
            .filter(|p| !doc.is_connected(p.container()))
            .map(Panel::id)
            .collect();
        for id in gone {
            self.close(doc, id);
        }
    }

    /// Grow a toolbar into a conversation for an ask, reply or template.
    fn grow_and_trigger<D: DocumentMut + ?Sized>(
        &mut self,
        doc: &mut D,
        id: PanelId,
        prompt: &str,
    ) -> Result<(), PanelError> {
        let panel = self.panels.get_mut(&id).ok_or(PanelError::UnknownPanel(id))?;
        let metrics = doc.metrics();
        let page = element_position(doc.bounding_rect(panel.container()), metrics.scroll, true);
        panel
            .placement
            .relocate(conversation_grow_position(page), &metrics);
        panel.set_css_position(CssPosition::Absolute);
        let hid_before = panel.overlay.hides_tool_row();
        panel.trigger(self.answers.as_mut(), Some(prompt));
        doc.set_container_style(panel.container(), panel.container_style());
        panel.placement.settle();
        if hid_before {
            self.commands.push(HostCommand::ToolRowVisibility {
                panel: id,
                visible: true,
            });
        }
        self.after_trigger(doc, id);
        Ok(())
    }

    fn after_trigger<D: DocumentMut + ?Sized>(&mut self, doc: &mut D, id: PanelId) {
        if self.config.always_pin_window
            && let Err(error) = self.dock(doc, id)
        {
            tracing::warn!(message = "panel.pin_failed", %error);
        }
    }
}

/// Toolbar-mode panels are removed by outside clicks and newer selections.
fn is_toolbar_mode(panel: &Panel) -> bool {
    panel.origin() == PanelOrigin::Selection && !panel.is_docked()
}

/// Normalized live selection, `None` when empty.
fn settled_selection<D: DocumentTree + ?Sized>(doc: &D) -> Option<String> {
    let snapshot = doc.selection();
    let text = normalize_selection(&snapshot.text);
    (!text.is_empty()).then(|| text.to_owned())
}

/// Commands that follow an overlay change: textarea focus and tool row
/// visibility.
fn overlay_effects(
    commands: &mut Vec<HostCommand>,
    panel: &Panel,
    transition: OverlayTransition,
    hid_before: bool,
) {
    if let Some(opened) = transition.opened()
        && opened.focuses_textarea()
    {
        commands.push(HostCommand::FocusTextarea {
            panel: panel.id(),
            overlay: opened,
        });
    }
    let hides = panel.overlay.hides_tool_row();
    if hides != hid_before {
        commands.push(HostCommand::ToolRowVisibility {
            panel: panel.id(),
            visible: !hides,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use perch_core::{DocumentArena, PageMetrics, SelectionSnapshot};
    use perch_runtime::{AnswerChunk, MemoryStore, ScriptedAnswerSource};

    fn doc() -> DocumentArena {
        DocumentArena::new(PageMetrics::viewport(1200.0, 800.0).with_document_height(3000.0))
    }

    fn controller(config: UserConfig) -> PerchController {
        PerchController::new(
            config,
            Box::new(ScriptedAnswerSource::new(vec![AnswerChunk::Done])),
            Box::new(MemoryStore::new()),
        )
        .expect("empty store loads")
    }

    fn select(doc: &mut DocumentArena, text: &str) {
        let body = doc.body().expect("body");
        let p = doc.append_element(body, "p");
        doc.set_selection(SelectionSnapshot::new(text, Some(p)));
    }

    fn open_toolbar_at(ctl: &mut PerchController, doc: &mut DocumentArena, x: f64, y: f64) -> PanelId {
        select(doc, "hello world");
        let body = doc.body().expect("body");
        ctl.handle(doc, HostEvent::PointerUp(PointerEvent::at(body, x, y)));
        ctl.advance(doc, Duration::ZERO);
        ctl.toolbar().expect("toolbar opened")
    }

    #[test]
    fn pointer_up_defers_toolbar_until_tick() {
        let mut doc = doc();
        let mut ctl = controller(UserConfig::default());
        select(&mut doc, "hello");
        let body = doc.body().expect("body");
        ctl.handle(&mut doc, HostEvent::PointerUp(PointerEvent::at(body, 400.0, 300.0)));
        assert_eq!(ctl.toolbar(), None);
        assert_eq!(ctl.pending_tasks(), 1);
        ctl.advance(&mut doc, Duration::ZERO);
        let id = ctl.toolbar().expect("toolbar");
        let panel = ctl.panel(id).expect("panel");
        assert_eq!(panel.placement.committed(), Position::new(400.0, 320.0));
        assert_eq!(panel.selection(), "hello");
    }

    #[test]
    fn dashes_only_selection_opens_nothing() {
        let mut doc = doc();
        let mut ctl = controller(UserConfig::default());
        select(&mut doc, " --- ");
        let body = doc.body().expect("body");
        ctl.handle(&mut doc, HostEvent::PointerUp(PointerEvent::at(body, 400.0, 300.0)));
        ctl.advance(&mut doc, Duration::ZERO);
        assert_eq!(ctl.toolbar(), None);
        assert_eq!(ctl.panels().count(), 0);
    }

    #[test]
    fn newer_selection_replaces_toolbar() {
        let mut doc = doc();
        let mut ctl = controller(UserConfig::default());
        let first = open_toolbar_at(&mut ctl, &mut doc, 400.0, 300.0);
        let second = open_toolbar_at(&mut ctl, &mut doc, 600.0, 500.0);
        assert_ne!(first, second);
        assert!(ctl.panel(first).is_none());
        assert_eq!(ctl.panels().count(), 1);
    }

    #[test]
    fn pointer_up_inside_toolbar_keeps_it() {
        let mut doc = doc();
        let mut ctl = controller(UserConfig::default());
        let id = open_toolbar_at(&mut ctl, &mut doc, 400.0, 300.0);
        let container = ctl.panel(id).expect("panel").container();
        let button = doc.append_element(container, "button");
        ctl.handle(&mut doc, HostEvent::PointerUp(PointerEvent::at(button, 410.0, 330.0)));
        ctl.advance(&mut doc, Duration::ZERO);
        assert_eq!(ctl.toolbar(), Some(id));
    }

    #[test]
    fn typing_elsewhere_with_empty_selection_removes_toolbar() {
        let mut doc = doc();
        let mut ctl = controller(UserConfig::default());
        let id = open_toolbar_at(&mut ctl, &mut doc, 400.0, 300.0);
        let body = doc.body().expect("body");
        let input = doc.append_element(body, "input");
        doc.clear_selection();
        ctl.handle(&mut doc, HostEvent::KeyDown(KeyEvent::new(input, perch_core::Key::Char('x'))));
        assert!(ctl.panel(id).is_some());
        ctl.advance(&mut doc, Duration::ZERO);
        assert!(ctl.panel(id).is_none());
    }

    #[test]
    fn hover_leave_dismisses_after_delay_and_reenter_cancels() {
        let mut doc = doc();
        let mut ctl = controller(UserConfig::default());
        let id = open_toolbar_at(&mut ctl, &mut doc, 400.0, 300.0);
        ctl.hover_enter(id, HoverRegion::HiddenTools).expect("panel");
        assert_eq!(ctl.panel(id).expect("panel").overlay.active(), Some(OverlayKind::HiddenTools));

        ctl.hover_leave(id, HoverRegion::HiddenTools).expect("panel");
        ctl.advance(&mut doc, Duration::from_millis(500));
        ctl.hover_enter(id, HoverRegion::HiddenTools).expect("panel");
        ctl.advance(&mut doc, Duration::from_millis(1000));
        assert_eq!(ctl.panel(id).expect("panel").overlay.active(), Some(OverlayKind::HiddenTools));

        ctl.hover_leave(id, HoverRegion::HiddenTools).expect("panel");
        ctl.advance(&mut doc, Duration::from_millis(999));
        assert_eq!(ctl.panel(id).expect("panel").overlay.active(), Some(OverlayKind::HiddenTools));
        ctl.advance(&mut doc, Duration::from_millis(1));
        assert_eq!(ctl.panel(id).expect("panel").overlay.active(), None);
    }

    #[test]
    fn close_is_idempotent_and_cancels_panel_timers() {
        let mut doc = doc();
        let mut ctl = controller(UserConfig::default());
        let id = open_toolbar_at(&mut ctl, &mut doc, 400.0, 300.0);
        ctl.hover_enter(id, HoverRegion::Reply).expect("panel");
        ctl.hover_leave(id, HoverRegion::Reply).expect("panel");
        assert_eq!(ctl.pending_tasks(), 1);
        assert!(ctl.close(&mut doc, id));
        assert!(!ctl.close(&mut doc, id));
        assert_eq!(ctl.pending_tasks(), 0);
        assert_eq!(ctl.toolbar(), None);
    }

    #[test]
    fn unknown_panel_is_an_error() {
        let mut doc = doc();
        let mut ctl = controller(UserConfig::default());
        let err = ctl
            .tool_click(&mut doc, PanelId::new(77), "translate")
            .expect_err("no such panel");
        assert!(matches!(err, PanelError::UnknownPanel(id) if id == PanelId::new(77)));
    }
}
