use crate::layout;
use crate::shape;
use crate::tree::{NodeIndex, Tree};
use crate::view::{NodeView, TextMeasure};
use circleview_core::{GeometryError, LayoutSettings, NodeData, TreeError};
use parking_lot::Mutex;
use std::collections::{HashSet, VecDeque};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::oneshot;

/// A structural operation on the diagram. Every mutation of the tree is
/// expressed as one of these and funnelled through the serialized queue, so
/// at most one relayout or drag is in flight at any time.
pub enum LayoutCommand {
    /// Full relayout, subject to coalescing: only a request still wanted
    /// when its turn comes actually runs.
    Relayout,
    Fold {
        full_name: String,
        fold: bool,
    },
    /// Install the filter collaborator's latest visibility snapshot.
    SetFilter {
        visible: Option<HashSet<String>>,
    },
    /// Drag gesture. With `expand` the ancestor chain grows to keep the
    /// node contained; without it the displacement is clamped at the rim.
    Drag {
        full_name: String,
        dx: f64,
        dy: f64,
        expand: bool,
    },
    /// An arbitrary structural mutation, run before the next relayout.
    Mutate(Box<dyn FnOnce(&mut Tree) + Send>),
}

impl fmt::Debug for LayoutCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LayoutCommand::Relayout => write!(f, "Relayout"),
            LayoutCommand::Fold { full_name, fold } => {
                write!(f, "Fold {{ full_name: {full_name:?}, fold: {fold} }}")
            }
            LayoutCommand::SetFilter { visible } => {
                write!(f, "SetFilter {{ visible: {visible:?} }}")
            }
            LayoutCommand::Drag {
                full_name,
                dx,
                dy,
                expand,
            } => write!(
                f,
                "Drag {{ full_name: {full_name:?}, dx: {dx}, dy: {dy}, expand: {expand} }}"
            ),
            LayoutCommand::Mutate(_) => write!(f, "Mutate(..)"),
        }
    }
}

type ActionResult = Result<(), GeometryError>;

struct QueuedAction {
    command: LayoutCommand,
    done: oneshot::Sender<ActionResult>,
}

/// The root object of the layout engine: owns the containment tree, the
/// settings, the view handles and the serialized action queue.
///
/// Cloning is cheap and shares the same diagram.
#[derive(Clone)]
pub struct Diagram {
    inner: Arc<DiagramInner>,
}

struct DiagramInner {
    tree: tokio::sync::Mutex<Tree>,
    settings: LayoutSettings,
    view: Arc<dyn NodeView>,
    measure: Arc<dyn TextMeasure>,
    queue: Mutex<VecDeque<QueuedAction>>,
    draining: AtomicBool,
    must_relayout: AtomicBool,
}

impl Diagram {
    pub fn new(
        data: &NodeData,
        settings: LayoutSettings,
        view: Arc<dyn NodeView>,
        measure: Arc<dyn TextMeasure>,
    ) -> Result<Self, TreeError> {
        Ok(Self {
            inner: Arc::new(DiagramInner {
                tree: tokio::sync::Mutex::new(Tree::build(data)?),
                settings,
                view,
                measure,
                queue: Mutex::new(VecDeque::new()),
                draining: AtomicBool::new(false),
                must_relayout: AtomicBool::new(false),
            }),
        })
    }

    pub fn settings(&self) -> &LayoutSettings {
        &self.inner.settings
    }

    /// Read access to the tree, for snapshots and assertions. Waits until
    /// no action is mutating it.
    pub async fn inspect<R>(&self, f: impl FnOnce(&Tree) -> R) -> R {
        let tree = self.inner.tree.lock().await;
        f(&tree)
    }

    /// Request a full relayout. Bursts coalesce: of several queued
    /// requests, only the last one still wanted when it runs does the work.
    pub async fn relayout_completely(&self) {
        self.inner.must_relayout.store(true, Ordering::SeqCst);
        let _ = self.run(LayoutCommand::Relayout).await;
    }

    /// Fold or unfold a node, then relayout.
    pub async fn fold(&self, full_name: &str, fold: bool) {
        let fold_done = self.enqueue(LayoutCommand::Fold {
            full_name: full_name.to_string(),
            fold,
        });
        self.inner.must_relayout.store(true, Ordering::SeqCst);
        let relayout_done = self.enqueue(LayoutCommand::Relayout);
        self.drain().await;
        let _ = fold_done.await;
        let _ = relayout_done.await;
    }

    /// Apply a new filter snapshot, then relayout.
    pub async fn set_filter(&self, visible: Option<HashSet<String>>) {
        let filter_done = self.enqueue(LayoutCommand::SetFilter { visible });
        self.inner.must_relayout.store(true, Ordering::SeqCst);
        let relayout_done = self.enqueue(LayoutCommand::Relayout);
        self.drain().await;
        let _ = filter_done.await;
        let _ = relayout_done.await;
    }

    /// Enqueue an arbitrary structural mutation to run before the next
    /// relayout. Resolves once the mutation ran.
    pub async fn schedule_action<F>(&self, action: F)
    where
        F: FnOnce(&mut Tree) + Send + 'static,
    {
        let _ = self.run(LayoutCommand::Mutate(Box::new(action))).await;
    }

    /// Drag a node by `(dx, dy)` relative to its parent, growing the
    /// ancestor chain when the node would otherwise escape.
    pub async fn jump_to_relative_displacement(&self, full_name: &str, dx: f64, dy: f64) {
        let _ = self
            .run(LayoutCommand::Drag {
                full_name: full_name.to_string(),
                dx,
                dy,
                expand: true,
            })
            .await;
    }

    /// Drag a node by `(dx, dy)` but never grow its parent: the
    /// displacement is cut short where containment ends.
    pub async fn drag_within_parent(
        &self,
        full_name: &str,
        dx: f64,
        dy: f64,
    ) -> Result<(), GeometryError> {
        self.run(LayoutCommand::Drag {
            full_name: full_name.to_string(),
            dx,
            dy,
            expand: false,
        })
        .await
    }

    fn enqueue(&self, command: LayoutCommand) -> oneshot::Receiver<ActionResult> {
        let (done, receiver) = oneshot::channel();
        self.inner
            .queue
            .lock()
            .push_back(QueuedAction { command, done });
        receiver
    }

    async fn run(&self, command: LayoutCommand) -> ActionResult {
        let receiver = self.enqueue(command);
        self.drain().await;
        receiver.await.unwrap_or(Ok(()))
    }

    /// Execute queued actions one at a time, each awaited before the next
    /// starts. Whoever finds the queue idle becomes the drainer; everyone
    /// else just waits for their action's completion.
    async fn drain(&self) {
        if self.inner.draining.swap(true, Ordering::SeqCst) {
            return;
        }
        loop {
            let action = self.inner.queue.lock().pop_front();
            match action {
                Some(action) => {
                    let result = self.execute(action.command).await;
                    let _ = action.done.send(result);
                }
                None => {
                    self.inner.draining.store(false, Ordering::SeqCst);
                    // An action may have been enqueued between the pop and
                    // the store; reclaim the drainer role if so.
                    if self.inner.queue.lock().is_empty()
                        || self.inner.draining.swap(true, Ordering::SeqCst)
                    {
                        return;
                    }
                }
            }
        }
    }

    async fn execute(&self, command: LayoutCommand) -> ActionResult {
        let inner = &self.inner;
        match command {
            LayoutCommand::Relayout => {
                let superseded = inner
                    .queue
                    .lock()
                    .iter()
                    .any(|queued| matches!(queued.command, LayoutCommand::Relayout));
                if superseded {
                    tracing::debug!("relayout deferred to a later queued request");
                    return Ok(());
                }
                if !inner.must_relayout.swap(false, Ordering::SeqCst) {
                    tracing::debug!("relayout request already satisfied, skipping");
                    return Ok(());
                }

                let mut tree = inner.tree.lock().await;
                tree.refresh_current_children();
                sync_visibility(&mut tree, inner.view.as_ref()).await;
                layout::initial_layout(
                    &mut tree,
                    inner.view.as_ref(),
                    inner.measure.as_ref(),
                    &inner.settings,
                )
                .await;
                let root = tree.root();
                layout::force_layout(&mut tree, inner.view.as_ref(), &inner.settings, root).await;
                Ok(())
            }
            LayoutCommand::Fold { full_name, fold } => {
                let mut tree = inner.tree.lock().await;
                match tree.index_of(&full_name) {
                    Ok(idx) => {
                        tree.set_folded(idx, fold);
                    }
                    Err(err) => tracing::warn!("ignoring fold request: {err}"),
                }
                Ok(())
            }
            LayoutCommand::SetFilter { visible } => {
                let mut tree = inner.tree.lock().await;
                tree.set_filter(visible);
                Ok(())
            }
            LayoutCommand::Drag {
                full_name,
                dx,
                dy,
                expand,
            } => {
                let mut tree = inner.tree.lock().await;
                match tree.index_of(&full_name) {
                    Ok(idx) => {
                        shape::jump_to_relative_displacement(
                            &mut tree,
                            inner.view.as_ref(),
                            inner.measure.as_ref(),
                            &inner.settings,
                            idx,
                            dx,
                            dy,
                            expand,
                        )
                        .await
                    }
                    Err(err) => {
                        tracing::warn!("ignoring drag request: {err}");
                        Ok(())
                    }
                }
            }
            LayoutCommand::Mutate(action) => {
                let mut tree = inner.tree.lock().await;
                action(&mut tree);
                Ok(())
            }
        }
    }
}

/// Tell the view which nodes entered or left the current layout since the
/// last relayout.
async fn sync_visibility(tree: &mut Tree, view: &dyn NodeView) {
    let visible: HashSet<NodeIndex> = tree.currently_visible().into_iter().collect();
    let all: Vec<NodeIndex> = tree.node_indices().collect();
    for idx in all {
        let should_show = visible.contains(&idx);
        if tree[idx].visible != should_show {
            tree[idx].visible = should_show;
            let ack = if should_show {
                view.show(&tree[idx].full_name)
            } else {
                view.hide(&tree[idx].full_name)
            };
            ack.await;
        }
    }
}
