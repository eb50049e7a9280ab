//! Context snapshots for external serialization.
//!
//! Distributed or checkpointed execution serializes a context's composite
//! state: the frame chain, package context, serializable metadata, enabled
//! options, and cancellation state convert to plain serde data. Registries
//! are heavy shared state and go through an injected
//! [`RegistrySnapshotter`], so a host can substitute a marker (and resolve
//! the shared registry set on restore) instead of duplicating it per
//! checkpoint. Transient metadata and closures held in frames do not
//! survive a snapshot (closures collapse to null; datasets materialize).

use serde::{Deserialize, Serialize};
use whistle_data::Data;

use crate::cancel::CancellationToken;
use crate::context::RuntimeContext;
use crate::errors::{EvalError, EvalResult};
use crate::frame::SharedFrame;
use crate::meta::SharedMeta;
use crate::options::EnabledOptions;
use crate::package::PackageContext;
use crate::registry::Registries;

/// Serializes registries out of (and back into) a snapshot.
pub trait RegistrySnapshotter {
    fn serialize(&self, registries: &Registries) -> EvalResult<Vec<u8>>;
    fn deserialize(&self, bytes: &[u8]) -> EvalResult<Registries>;
}

/// One frame of the chain, bottom-first in [`ContextSnapshot::frames`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FrameSnapshot {
    pub name: String,
    pub inherit_parent_vars: bool,
    /// Local bindings, sorted by name.
    pub vars: Vec<(String, Data)>,
}

/// The serializable composite state of a context.
#[derive(Serialize, Deserialize)]
pub struct ContextSnapshot {
    /// Frame chain from the bottom (root) frame to the top.
    pub frames: Vec<FrameSnapshot>,
    pub package: PackageContext,
    /// Serializable metadata entries, sorted by key.
    pub meta: Vec<(String, Data)>,
    /// Enabled option names, sorted.
    pub options: Vec<String>,
    /// Cancellation reason, when the token was already cancelled.
    pub cancelled: Option<String>,
    pub frame_limit: usize,
    /// Opaque registry blob produced by the injected snapshotter.
    pub registries: Vec<u8>,
}

impl RuntimeContext {
    /// Capture this context's composite state.
    pub fn snapshot(&self, snapshotter: &dyn RegistrySnapshotter) -> EvalResult<ContextSnapshot> {
        let mut frames = Vec::new();
        let mut current = Some(self.top_frame().clone());
        while let Some(frame) = current {
            frames.push(FrameSnapshot {
                name: frame.name(),
                inherit_parent_vars: frame.inherits_parent_vars(),
                vars: frame.local_bindings(),
            });
            current = frame.parent();
        }
        frames.reverse();

        let meta = self
            .meta()
            .serializable_snapshot()
            .as_container()
            .map(|map| {
                map.iter()
                    .map(|(key, value)| (key.clone(), value.clone()))
                    .collect()
            })
            .unwrap_or_default();

        Ok(ContextSnapshot {
            frames,
            package: self.package_context().clone(),
            meta,
            options: self.options().snapshot(),
            cancelled: if self.cancellation().is_cancelled() {
                self.cancellation().reason()
            } else {
                None
            },
            frame_limit: self.frame_limit(),
            registries: snapshotter.serialize(self.registries())?,
        })
    }

    /// Reconstruct a context from a snapshot. The first frame becomes the
    /// bottom (root) frame; the rest re-link in order.
    pub fn restore(
        snapshot: &ContextSnapshot,
        snapshotter: &dyn RegistrySnapshotter,
    ) -> EvalResult<RuntimeContext> {
        let registries = snapshotter.deserialize(&snapshot.registries)?;

        let mut frames = snapshot.frames.iter();
        let Some(first) = frames.next() else {
            return Err(EvalError::new("context snapshot holds no frames"));
        };
        let bottom = SharedFrame::root(first.name.clone());
        for (name, value) in &first.vars {
            bottom.set_local(name.clone(), value.clone());
        }
        let mut top = bottom.clone();
        for frame in frames {
            let next =
                SharedFrame::with_parent(frame.name.clone(), top, frame.inherit_parent_vars);
            for (name, value) in &frame.vars {
                next.set_local(name.clone(), value.clone());
            }
            top = next;
        }

        let meta = SharedMeta::new();
        meta.restore_serializable(snapshot.meta.iter().cloned());

        let cancel = CancellationToken::new();
        if let Some(reason) = &snapshot.cancelled {
            cancel.cancel(reason);
        }

        Ok(RuntimeContext::from_parts(
            top,
            bottom,
            snapshot.package.clone(),
            registries,
            meta,
            cancel,
            EnabledOptions::from_names(snapshot.options.iter().cloned()),
            snapshot.frame_limit,
        ))
    }
}
