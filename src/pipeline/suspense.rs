//! Suspense handler - The boundary's primary/fallback state machine.
//!
//! A boundary is either showing its primary children or, after a child
//! suspended (`DID_CAPTURE`), its fallback. While timed out the children
//! are wrapped in two fragments:
//!
//! ```text
//! Suspense (memoized_state = Suspense { timed_out_at })
//!   ├─ Fragment (primary, hidden)  ─► the primary children
//!   └─ Fragment (fallback)         ─► the fallback children
//! ```
//!
//! | committed | captured | result                                   |
//! |-----------|----------|------------------------------------------|
//! | none      | no       | mount primary children                   |
//! | none      | yes      | new primary + fallback fragments         |
//! | normal    | no       | diff primary children                    |
//! | normal    | yes      | wrap current children, place fallback    |
//! | timed out | yes      | twins of both fragments                  |
//! | timed out | no       | diff primary children, drop the wrappers |
//!
//! In legacy mode (no `CONCURRENT` bit) a timed-out boundary keeps the
//! partially rendered primary children instead of the committed ones.

use crate::engine::{FiberId, MemoizedState, SuspenseState};
use crate::error::{BeginWorkError, WorkResult};
use crate::primitives::{Children, Props};
use crate::types::{EffectTag, ExpirationTime, TypeOfMode};

use super::begin_work::WorkContext;

impl WorkContext<'_> {
    /// Begin a suspense boundary. Returns the fallback fragment while timed
    /// out, else the first primary child.
    pub(super) fn update_suspense_component(
        &mut self,
        current: Option<FiberId>,
        wip: FiberId,
        render_time: ExpirationTime,
    ) -> WorkResult<Option<FiberId>> {
        let fiber = self.tree.fiber_mut(wip)?;
        let mode = fiber.mode;
        let props = fiber.pending_props.clone();
        let progressed_state = fiber.memoized_state.suspense();

        let next_state = if fiber.effect_tag.contains(EffectTag::DID_CAPTURE) {
            fiber.effect_tag.remove(EffectTag::DID_CAPTURE);
            Some(SuspenseState {
                timed_out_at: progressed_state
                    .map_or(ExpirationTime::NO_WORK, |state| state.timed_out_at),
            })
        } else {
            None
        };
        let timed_out = next_state.is_some();

        let (child, next) = match current {
            None if timed_out => {
                log::debug!("[SUSPENSE] mount with fallback: fiber={wip:?}");
                let primary =
                    self.tree
                        .create_fiber_from_fragment(Children::Empty, mode, ExpirationTime::NO_WORK, None);
                if !mode.contains(TypeOfMode::CONCURRENT) {
                    let progressed = self.progressed_primary_child(wip, progressed_state.is_some())?;
                    self.tree.fiber_mut(primary)?.child = progressed;
                }
                let fallback = self.tree.create_fiber_from_fragment(
                    props.description(Props::FALLBACK),
                    mode,
                    render_time,
                    None,
                );
                self.link_fragments(wip, primary, fallback)?;
                (Some(primary), Some(fallback))
            }
            None => {
                let child =
                    self.host
                        .mount_child_fibers(self.tree, wip, &props.children(), render_time)?;
                (child, child)
            }
            Some(current) => match self.tree.fiber(current)?.memoized_state.suspense() {
                Some(_) => {
                    let current_primary = self
                        .tree
                        .fiber(current)?
                        .child
                        .ok_or(BeginWorkError::MalformedSuspense(wip))?;
                    let current_primary_child = self.tree.fiber(current_primary)?.child;

                    if timed_out {
                        let current_fallback = self
                            .tree
                            .fiber(current_primary)?
                            .sibling
                            .ok_or(BeginWorkError::MalformedSuspense(wip))?;
                        let primary_props = self.tree.fiber(current_primary)?.pending_props.clone();
                        let primary = self.tree.create_work_in_progress(current_primary, primary_props)?;
                        if !mode.contains(TypeOfMode::CONCURRENT) {
                            let progressed =
                                self.progressed_primary_child(wip, progressed_state.is_some())?;
                            if progressed != current_primary_child {
                                self.tree.fiber_mut(primary)?.child = progressed;
                            }
                        }
                        let fallback = self.tree.create_work_in_progress(
                            current_fallback,
                            Props::from_children(props.description(Props::FALLBACK)),
                        )?;
                        self.tree.fiber_mut(primary)?.child_expiration_time = ExpirationTime::NO_WORK;
                        self.link_fragments(wip, primary, fallback)?;
                        (Some(primary), Some(fallback))
                    } else {
                        log::debug!("[SUSPENSE] fallback -> primary: fiber={wip:?}");
                        let child = self.host.reconcile_child_fibers(
                            self.tree,
                            wip,
                            current_primary_child,
                            &props.children(),
                            render_time,
                        )?;
                        (child, child)
                    }
                }
                None => {
                    let current_child = self.tree.fiber(current)?.child;
                    if timed_out {
                        log::debug!("[SUSPENSE] primary -> fallback: fiber={wip:?}");
                        let primary = self.tree.create_fiber_from_fragment(
                            Children::Empty,
                            mode,
                            ExpirationTime::NO_WORK,
                            None,
                        );
                        let primary_child = if mode.contains(TypeOfMode::CONCURRENT) {
                            current_child
                        } else {
                            self.progressed_primary_child(wip, progressed_state.is_some())?
                        };
                        self.tree.fiber_mut(primary)?.child = primary_child;
                        let fallback = self.tree.create_fiber_from_fragment(
                            props.description(Props::FALLBACK),
                            mode,
                            render_time,
                            None,
                        );
                        self.tree.fiber_mut(fallback)?.effect_tag |= EffectTag::PLACEMENT;
                        self.tree.fiber_mut(primary)?.child_expiration_time = ExpirationTime::NO_WORK;
                        self.link_fragments(wip, primary, fallback)?;
                        (Some(primary), Some(fallback))
                    } else {
                        let child = self.host.reconcile_child_fibers(
                            self.tree,
                            wip,
                            current_child,
                            &props.children(),
                            render_time,
                        )?;
                        (child, child)
                    }
                }
            },
        };

        let fiber = self.tree.fiber_mut(wip)?;
        fiber.memoized_state = match next_state {
            Some(state) => MemoizedState::Suspense(state),
            None => MemoizedState::None,
        };
        fiber.child = child;
        Ok(next)
    }

    /// Primary children rendered so far in this pass: inside the primary
    /// fragment when the boundary was already wrapped, else direct children.
    fn progressed_primary_child(
        &self,
        wip: FiberId,
        wrapped: bool,
    ) -> WorkResult<Option<FiberId>> {
        let child = self.tree.fiber(wip)?.child;
        if !wrapped {
            return Ok(child);
        }
        match child {
            Some(fragment) => Ok(self.tree.fiber(fragment)?.child),
            None => Err(BeginWorkError::MalformedSuspense(wip)),
        }
    }

    fn link_fragments(&mut self, wip: FiberId, primary: FiberId, fallback: FiberId) -> WorkResult<()> {
        let fiber = self.tree.fiber_mut(primary)?;
        fiber.sibling = Some(fallback);
        fiber.return_fiber = Some(wip);
        let fiber = self.tree.fiber_mut(fallback)?;
        fiber.sibling = None;
        fiber.return_fiber = Some(wip);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::engine::{FiberId, FiberTree, MemoizedState, SuspenseState};
    use crate::pipeline::test_support::{ReconcileCall, TestHost, complete, committed_pair};
    use crate::primitives::{Children, ElementType, PropValue, Props};
    use crate::types::{EffectTag, ExpirationTime, TypeOfMode, WorkTag};

    fn boundary_props(content: &str, fallback: &str) -> Props {
        Props::new()
            .with(Props::CHILDREN, Children::text(content))
            .with(Props::FALLBACK, Children::text(fallback))
    }

    fn boundary(tree: &mut FiberTree, props: Props, mode: TypeOfMode) -> FiberId {
        tree.create_fiber_from_type_and_props(
            &ElementType::Suspense,
            None,
            props,
            mode,
            ExpirationTime::SYNC,
        )
    }

    fn capture(tree: &mut FiberTree, id: FiberId) {
        tree.fiber_mut(id).unwrap().effect_tag |= EffectTag::DID_CAPTURE;
    }

    fn fallback_text(tree: &FiberTree, fragment: FiberId) -> Option<String> {
        match tree.fiber(fragment).unwrap().pending_props.get(Props::CHILDREN) {
            Some(PropValue::Children(Children::Text(text))) => Some(text.to_string()),
            _ => None,
        }
    }

    /// Committed boundary showing its fallback, with `content` hidden in
    /// the primary fragment.
    fn committed_timed_out(
        tree: &mut FiberTree,
        props: Props,
        mode: TypeOfMode,
    ) -> (FiberId, FiberId, FiberId, FiberId) {
        let current = boundary(tree, props.clone(), mode);
        tree.fiber_mut(current).unwrap().expiration_time = ExpirationTime::NO_WORK;
        let content = tree.create_fiber_from_text("content", mode, ExpirationTime::NO_WORK);
        let primary = tree.create_fiber_from_fragment(Children::Empty, mode, ExpirationTime::NO_WORK, None);
        let fallback = tree.create_fiber_from_fragment(
            props.description(Props::FALLBACK),
            mode,
            ExpirationTime::NO_WORK,
            None,
        );
        tree.set_child_chain(primary, &[content]).unwrap();
        tree.set_child_chain(current, &[primary, fallback]).unwrap();
        for id in [current, primary, fallback, content] {
            complete(tree, id);
        }
        tree.fiber_mut(current).unwrap().memoized_state = MemoizedState::Suspense(SuspenseState {
            timed_out_at: ExpirationTime::new(7),
        });
        (current, primary, fallback, content)
    }

    // =========================================================================
    // Mount
    // =========================================================================

    #[test]
    fn test_mount_renders_primary_children() {
        let mut host = TestHost::new();
        let (mut tree, mut stacks) = TestHost::pass();
        let wip = boundary(&mut tree, boundary_props("content", "loading"), TypeOfMode::NO_CONTEXT);

        let mut ctx = host.context(&mut tree, &mut stacks);
        let next = ctx.begin_work(None, wip, ExpirationTime::SYNC).unwrap().expect("child");
        assert_eq!(ctx.tree.fiber(next).unwrap().tag(), WorkTag::HostText);
        assert!(!ctx.tree.fiber(wip).unwrap().is_timed_out());
    }

    #[test]
    fn test_captured_mount_shows_fallback() {
        let mut host = TestHost::new();
        let (mut tree, mut stacks) = TestHost::pass();
        let wip = boundary(&mut tree, boundary_props("content", "loading"), TypeOfMode::CONCURRENT);
        capture(&mut tree, wip);

        let mut ctx = host.context(&mut tree, &mut stacks);
        let fallback = ctx.begin_work(None, wip, ExpirationTime::SYNC).unwrap().expect("fallback");
        let fiber = ctx.tree.fiber(wip).unwrap();
        assert!(!fiber.effect_tag.contains(EffectTag::DID_CAPTURE));
        assert_eq!(
            fiber.memoized_state.suspense(),
            Some(SuspenseState { timed_out_at: ExpirationTime::NO_WORK })
        );
        let primary = fiber.child.expect("primary fragment");

        let tree = &*ctx.tree;
        assert_eq!(tree.fiber(primary).unwrap().tag(), WorkTag::Fragment);
        assert_eq!(tree.fiber(primary).unwrap().child, None);
        assert_eq!(tree.fiber(primary).unwrap().sibling, Some(fallback));
        assert_eq!(tree.fiber(fallback).unwrap().return_fiber, Some(wip));
        assert_eq!(tree.fiber(fallback).unwrap().expiration_time, ExpirationTime::SYNC);
        assert_eq!(fallback_text(tree, fallback).as_deref(), Some("loading"));
    }

    #[test]
    fn test_legacy_capture_keeps_progressed_children() {
        let mut host = TestHost::new();
        let (mut tree, mut stacks) = TestHost::pass();
        let wip = boundary(&mut tree, boundary_props("content", "loading"), TypeOfMode::NO_CONTEXT);

        let mut ctx = host.context(&mut tree, &mut stacks);
        let progressed = ctx.begin_work(None, wip, ExpirationTime::SYNC).unwrap().expect("child");
        drop(ctx);
        capture(&mut tree, wip);

        let mut ctx = host.context(&mut tree, &mut stacks);
        ctx.begin_work(None, wip, ExpirationTime::SYNC).unwrap();
        let primary = ctx.tree.fiber(wip).unwrap().child.expect("primary");
        assert_eq!(ctx.tree.fiber(primary).unwrap().child, Some(progressed));
    }

    #[test]
    fn test_repeated_capture_keeps_state() {
        let mut host = TestHost::new();
        let (mut tree, mut stacks) = TestHost::pass();
        let wip = boundary(&mut tree, boundary_props("content", "loading"), TypeOfMode::NO_CONTEXT);
        let mut ctx = host.context(&mut tree, &mut stacks);
        let progressed = ctx.begin_work(None, wip, ExpirationTime::SYNC).unwrap();
        drop(ctx);

        for _ in 0..2 {
            capture(&mut tree, wip);
            let mut ctx = host.context(&mut tree, &mut stacks);
            ctx.begin_work(None, wip, ExpirationTime::SYNC).unwrap();
            drop(ctx);
            let fiber = tree.fiber(wip).unwrap();
            assert!(fiber.is_timed_out());
            let primary = fiber.child.expect("primary");
            assert_eq!(tree.fiber(primary).unwrap().child, progressed);
        }
    }

    /// Tags and text of the child chain under `parent`.
    fn chain_shape(tree: &FiberTree, parent: FiberId) -> Vec<(WorkTag, Option<String>)> {
        tree.children(parent)
            .unwrap()
            .iter()
            .map(|id| {
                let fiber = tree.fiber(*id).unwrap();
                let text = match fiber.pending_props.children() {
                    Children::Text(text) => Some(text.to_string()),
                    _ => None,
                };
                (fiber.tag(), text)
            })
            .collect()
    }

    fn same_call(a: &ReconcileCall, b: &ReconcileCall) -> bool {
        match (a, b) {
            (
                ReconcileCall::Mount { parent: pa, children: ca },
                ReconcileCall::Mount { parent: pb, children: cb },
            ) => pa == pb && ca.is_same(cb),
            (
                ReconcileCall::Reconcile { parent: pa, current_first_child: fa, children: ca },
                ReconcileCall::Reconcile { parent: pb, current_first_child: fb, children: cb },
            ) => pa == pb && fa == fb && ca.is_same(cb),
            _ => false,
        }
    }

    #[test]
    fn test_uncaptured_mount_is_repeatable() {
        let mut host = TestHost::new();
        let (mut tree, mut stacks) = TestHost::pass();
        let wip = boundary(&mut tree, boundary_props("content", "loading"), TypeOfMode::NO_CONTEXT);

        let mut shapes = Vec::new();
        for _ in 0..2 {
            let mut ctx = host.context(&mut tree, &mut stacks);
            ctx.begin_work(None, wip, ExpirationTime::SYNC).unwrap();
            drop(ctx);
            let fiber = tree.fiber(wip).unwrap();
            assert!(!fiber.is_timed_out());
            assert!(matches!(fiber.memoized_state, MemoizedState::None));
            shapes.push(chain_shape(&tree, wip));
        }

        assert_eq!(shapes[0], shapes[1]);
        assert_eq!(shapes[0], vec![(WorkTag::HostText, Some("content".to_string()))]);
        assert_eq!(host.calls.len(), 2);
        assert!(same_call(&host.calls[0], &host.calls[1]));
        assert_eq!(host.calls[0].parent(), wip);
    }

    #[test]
    fn test_uncaptured_update_is_repeatable() {
        let mut host = TestHost::new();
        let (mut tree, mut stacks) = TestHost::pass();
        let (current, wip) = committed_pair(
            &mut tree,
            &ElementType::Suspense,
            boundary_props("content", "loading"),
            boundary_props("content", "loading"),
            TypeOfMode::CONCURRENT,
        );
        let content = tree.create_fiber_from_text("content", TypeOfMode::CONCURRENT, ExpirationTime::NO_WORK);
        tree.set_child_chain(current, &[content]).unwrap();

        let mut chains = Vec::new();
        for _ in 0..2 {
            let mut ctx = host.context(&mut tree, &mut stacks);
            let next = ctx.begin_work(Some(current), wip, ExpirationTime::SYNC).unwrap();
            drop(ctx);
            let fiber = tree.fiber(wip).unwrap();
            assert!(!fiber.is_timed_out());
            assert!(matches!(fiber.memoized_state, MemoizedState::None));
            assert_eq!(fiber.child, next);
            chains.push(tree.children(wip).unwrap().to_vec());
        }

        assert_eq!(chains[0], chains[1], "the same twins are reused");
        assert_eq!(tree.fiber(chains[0][0]).unwrap().alternate, Some(content));
        assert_eq!(host.calls.len(), 2);
        assert!(same_call(&host.calls[0], &host.calls[1]));
        assert_eq!(host.calls[1].parent(), wip);
    }

    // =========================================================================
    // Update
    // =========================================================================

    #[test]
    fn test_capture_wraps_committed_children() {
        let mut host = TestHost::new();
        let (mut tree, mut stacks) = TestHost::pass();
        let (current, wip) = committed_pair(
            &mut tree,
            &ElementType::Suspense,
            boundary_props("content", "loading"),
            boundary_props("content", "loading"),
            TypeOfMode::CONCURRENT,
        );
        let content = tree.create_fiber_from_text("content", TypeOfMode::CONCURRENT, ExpirationTime::NO_WORK);
        tree.set_child_chain(current, &[content]).unwrap();
        capture(&mut tree, wip);

        let mut ctx = host.context(&mut tree, &mut stacks);
        let fallback = ctx
            .begin_work(Some(current), wip, ExpirationTime::SYNC)
            .unwrap()
            .expect("fallback");
        let tree = &*ctx.tree;
        let primary = tree.fiber(wip).unwrap().child.expect("primary");
        assert_eq!(tree.fiber(primary).unwrap().child, Some(content));
        assert_eq!(tree.fiber(primary).unwrap().child_expiration_time, ExpirationTime::NO_WORK);
        assert!(tree.fiber(fallback).unwrap().effect_tag.contains(EffectTag::PLACEMENT));
        assert!(tree.fiber(wip).unwrap().is_timed_out());
    }

    #[test]
    fn test_still_timed_out_reuses_both_fragments() {
        let mut host = TestHost::new();
        let (mut tree, mut stacks) = TestHost::pass();
        let (current, primary, fallback, content) = committed_timed_out(
            &mut tree,
            boundary_props("content", "loading"),
            TypeOfMode::NO_CONTEXT,
        );
        let wip = tree
            .create_work_in_progress(current, boundary_props("content", "still loading"))
            .unwrap();
        capture(&mut tree, wip);

        let mut ctx = host.context(&mut tree, &mut stacks);
        let next = ctx
            .begin_work(Some(current), wip, ExpirationTime::SYNC)
            .unwrap()
            .expect("fallback twin");
        let tree = &*ctx.tree;
        let primary_twin = tree.fiber(wip).unwrap().child.expect("primary twin");
        assert_eq!(tree.fiber(primary_twin).unwrap().alternate, Some(primary));
        assert_eq!(tree.fiber(primary_twin).unwrap().child, Some(content));
        assert_eq!(tree.fiber(primary_twin).unwrap().sibling, Some(next));
        assert_eq!(tree.fiber(next).unwrap().alternate, Some(fallback));
        assert_eq!(fallback_text(tree, next).as_deref(), Some("still loading"));
        assert_eq!(
            tree.fiber(wip).unwrap().memoized_state.suspense(),
            Some(SuspenseState { timed_out_at: ExpirationTime::new(7) })
        );
    }

    #[test]
    fn test_resolved_boundary_unwraps_primary_children() {
        let mut host = TestHost::new();
        let (mut tree, mut stacks) = TestHost::pass();
        let (current, _, _, content) = committed_timed_out(
            &mut tree,
            boundary_props("content", "loading"),
            TypeOfMode::CONCURRENT,
        );
        let wip = tree
            .create_work_in_progress(current, boundary_props("content", "loading"))
            .unwrap();

        let mut ctx = host.context(&mut tree, &mut stacks);
        let next = ctx.begin_work(Some(current), wip, ExpirationTime::SYNC).unwrap();
        let fiber = ctx.tree.fiber(wip).unwrap();
        assert!(!fiber.is_timed_out());
        assert_eq!(fiber.child, next);
        drop(ctx);

        match host.calls.as_slice() {
            [ReconcileCall::Reconcile { current_first_child, .. }] => {
                assert_eq!(*current_first_child, Some(content));
            }
            other => panic!("unexpected calls: {other:?}"),
        }
    }

    #[test]
    fn test_missing_fallback_fragment_is_malformed() {
        let mut host = TestHost::new();
        let (mut tree, mut stacks) = TestHost::pass();
        let (current, primary, _, _) = committed_timed_out(
            &mut tree,
            boundary_props("content", "loading"),
            TypeOfMode::NO_CONTEXT,
        );
        tree.fiber_mut(primary).unwrap().sibling = None;
        let wip = tree
            .create_work_in_progress(current, boundary_props("content", "loading"))
            .unwrap();
        capture(&mut tree, wip);

        let mut ctx = host.context(&mut tree, &mut stacks);
        let err = ctx.begin_work(Some(current), wip, ExpirationTime::SYNC).unwrap_err();
        assert!(matches!(err, crate::BeginWorkError::MalformedSuspense(id) if id == wip));
    }

    // =========================================================================
    // Fast Bailout
    // =========================================================================

    #[test]
    fn test_bailout_of_timed_out_boundary_continues_at_fallback() {
        let mut host = TestHost::new();
        let (mut tree, mut stacks) = TestHost::pass();
        let props = boundary_props("content", "loading");
        let (current, _, fallback, _) = committed_timed_out(&mut tree, props, TypeOfMode::NO_CONTEXT);
        tree.fiber_mut(current).unwrap().child_expiration_time = ExpirationTime::SYNC;
        let same = tree.fiber(current).unwrap().memoized_props.clone().unwrap();
        let wip = tree.create_work_in_progress(current, same).unwrap();

        let mut ctx = host.context(&mut tree, &mut stacks);
        let next = ctx
            .begin_work(Some(current), wip, ExpirationTime::SYNC)
            .unwrap()
            .expect("fallback twin");
        assert_eq!(ctx.stats.fast_bailouts, 1);
        assert_eq!(ctx.stats.handler_runs, 0);
        assert_eq!(ctx.tree.fiber(next).unwrap().alternate, Some(fallback));
    }

    #[test]
    fn test_bailout_with_work_in_primary_retries_boundary() {
        let mut host = TestHost::new();
        let (mut tree, mut stacks) = TestHost::pass();
        let props = boundary_props("content", "loading");
        let (current, primary, _, _) = committed_timed_out(&mut tree, props, TypeOfMode::NO_CONTEXT);
        tree.fiber_mut(primary).unwrap().child_expiration_time = ExpirationTime::SYNC;
        let same = tree.fiber(current).unwrap().memoized_props.clone().unwrap();
        let wip = tree.create_work_in_progress(current, same).unwrap();

        let mut ctx = host.context(&mut tree, &mut stacks);
        ctx.begin_work(Some(current), wip, ExpirationTime::SYNC).unwrap();
        assert_eq!(ctx.stats.fast_bailouts, 1);
        assert_eq!(ctx.stats.handler_runs, 1);
        assert!(!ctx.tree.fiber(wip).unwrap().is_timed_out(), "retry shows primary children");
    }
}
