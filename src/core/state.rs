//! # State table.
//!
//! Address-ordered map of live contexts plus the routing table and named
//! groups. Ordering makes subtree queries a single range scan:
//!
//! ```text
//! "/a"      ◄─ range start for children of /a is "/a/"
//! "/a/b"    ┐
//! "/a/b/c"  │ prefix "/a/"
//! "/a/d"    ┘
//! "/ab"     ◄─ first key without the prefix, scan stops
//! ```
//!
//! ## Rules
//! - root and DISCARD never have a context;
//! - removing a context also drops its group memberships and every route
//!   that points at it or was registered for it.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::ops::Bound;

use crate::address::Address;

use super::context::Context;

#[derive(Debug, Default)]
pub(crate) struct State {
    contexts: BTreeMap<Address, Context>,
    /// routed target → router
    routes: HashMap<Address, Address>,
    groups: HashMap<String, BTreeSet<Address>>,
}

impl State {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a context, returning the one it replaced.
    pub fn put(&mut self, ctx: Context) -> Option<Context> {
        self.contexts.insert(ctx.address.clone(), ctx)
    }

    pub fn get(&self, addr: &Address) -> Option<&Context> {
        self.contexts.get(addr)
    }

    pub fn get_mut(&mut self, addr: &Address) -> Option<&mut Context> {
        self.contexts.get_mut(addr)
    }

    pub fn contains(&self, addr: &Address) -> bool {
        self.contexts.contains_key(addr)
    }

    pub fn len(&self) -> usize {
        self.contexts.len()
    }

    pub fn remove(&mut self, addr: &Address) -> Option<Context> {
        let ctx = self.contexts.remove(addr)?;
        self.routes
            .retain(|target, router| target != addr && router != addr);
        self.groups.retain(|_, members| {
            members.remove(addr);
            !members.is_empty()
        });
        Some(ctx)
    }

    /// Every live descendant of `addr`, in address order (parents first).
    pub fn get_children(&self, addr: &Address) -> Vec<Address> {
        let prefix = addr.subtree_prefix();
        self.contexts
            .range::<str, _>((Bound::Included(prefix.as_str()), Bound::Unbounded))
            .map(|(k, _)| k)
            .take_while(|k| k.as_str().starts_with(&prefix))
            .cloned()
            .collect()
    }

    /// Live children exactly one level below `addr`.
    pub fn direct_children(&self, addr: &Address) -> Vec<Address> {
        let depth = addr.depth() + 1;
        self.get_children(addr)
            .into_iter()
            .filter(|c| c.depth() == depth)
            .collect()
    }

    /// Registers `router` for `target` and its subtree.
    pub fn put_route(&mut self, target: Address, router: Address) -> Option<Address> {
        self.routes.insert(target, router)
    }

    pub fn remove_route(&mut self, target: &Address) -> Option<Address> {
        self.routes.remove(target)
    }

    /// Router responsible for `to`: the route registered on the closest
    /// ancestor-or-self of `to`. A router never routes messages addressed to
    /// itself or to its own subtree.
    pub fn get_router(&self, to: &Address) -> Option<Address> {
        if self.routes.is_empty() {
            return None;
        }
        to.ancestry()
            .filter_map(|level| self.routes.get(&level))
            .find(|router| *router != to && !to.is_descendant_of(router))
            .cloned()
    }

    /// Adds `addr` to `group`; `false` if it was already a member.
    pub fn put_member(&mut self, group: &str, addr: Address) -> bool {
        self.groups.entry(group.to_string()).or_default().insert(addr)
    }

    pub fn remove_member(&mut self, group: &str, addr: &Address) -> bool {
        let Some(members) = self.groups.get_mut(group) else {
            return false;
        };
        let removed = members.remove(addr);
        if members.is_empty() {
            self.groups.remove(group);
        }
        removed
    }

    /// Members of `group` in address order.
    pub fn get_group(&self, group: &str) -> Vec<Address> {
        self.groups
            .get(group)
            .map(|m| m.iter().cloned().collect())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actor::{Actor, Behaviour, Template};
    use crate::vm::Runtime;

    struct Idle;
    impl Actor for Idle {}

    fn ctx(path: &str) -> Context {
        let address = Address::parse(path).unwrap();
        Context::new(
            address.clone(),
            0,
            Box::new(Idle),
            Behaviour::direct(),
            Template::new(|_| Box::new(Idle)),
            Runtime::new(address, 0, 8),
        )
    }

    fn addr(path: &str) -> Address {
        Address::parse(path).unwrap()
    }

    fn table(paths: &[&str]) -> State {
        let mut state = State::new();
        for p in paths {
            state.put(ctx(p));
        }
        state
    }

    #[test]
    fn test_get_children_is_segment_aware_and_ordered() {
        let state = table(&["/a", "/a/b", "/a/b/c", "/a/d", "/ab", "/z"]);

        assert_eq!(
            state.get_children(&addr("/a")),
            vec![addr("/a/b"), addr("/a/b/c"), addr("/a/d")]
        );
        assert_eq!(state.direct_children(&addr("/a")), vec![addr("/a/b"), addr("/a/d")]);
        assert_eq!(state.get_children(&Address::root()).len(), 6);
        assert!(state.get_children(&addr("/z")).is_empty());
    }

    #[test]
    fn test_remove_cleans_groups_and_routes() {
        let mut state = table(&["/r", "/w"]);
        state.put_member("pool", addr("/w"));
        state.put_route(addr("/w"), addr("/r"));

        assert!(state.remove(&addr("/r")).is_some());
        assert_eq!(state.get_router(&addr("/w")), None);

        state.remove(&addr("/w"));
        assert!(state.get_group("pool").is_empty());
        assert!(state.remove(&addr("/w")).is_none());
    }

    #[test]
    fn test_router_covers_target_and_subtree() {
        let mut state = State::new();
        state.put_route(addr("/svc"), addr("/gw"));

        assert_eq!(state.get_router(&addr("/svc")), Some(addr("/gw")));
        assert_eq!(state.get_router(&addr("/svc/w1")), Some(addr("/gw")));
        assert_eq!(state.get_router(&addr("/svcx")), None);
    }

    #[test]
    fn test_router_never_routes_own_subtree() {
        let mut state = State::new();
        state.put_route(addr("/svc"), addr("/svc/gw"));

        assert_eq!(state.get_router(&addr("/svc/w1")), Some(addr("/svc/gw")));
        assert_eq!(state.get_router(&addr("/svc/gw")), None);
        assert_eq!(state.get_router(&addr("/svc/gw/inner")), None);
    }

    #[test]
    fn test_groups_are_sets() {
        let mut state = State::new();
        assert!(state.put_member("g", addr("/b")));
        assert!(state.put_member("g", addr("/a")));
        assert!(!state.put_member("g", addr("/a")));
        assert_eq!(state.get_group("g"), vec![addr("/a"), addr("/b")]);

        assert!(state.remove_member("g", &addr("/a")));
        assert!(!state.remove_member("missing", &addr("/a")));
    }
}
