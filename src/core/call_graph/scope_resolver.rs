// src/core/call_graph/scope_resolver.rs
use std::collections::{HashSet, VecDeque};

use crate::core::index::{ClassRecord, MethodId, MethodRecord, Receiver, SourceIndex};
use crate::core::languages::simple_name;

/// Heuristic receiver-type resolution over the source index.
///
/// Lookups are layered: declarations local to the method, then the index,
/// then a simple-name scan. A miss means the edge is unresolvable.
pub struct ScopeResolver<'a> {
    index: &'a SourceIndex,
    excluded_namespaces: &'a [String],
}

impl<'a> ScopeResolver<'a> {
    pub fn new(index: &'a SourceIndex, excluded_namespaces: &'a [String]) -> Self {
        Self {
            index,
            excluded_namespaces,
        }
    }

    /// Types under an excluded namespace are framework plumbing
    pub fn is_excluded(&self, type_name: &str) -> bool {
        self.excluded_namespaces.iter().any(|ns| type_name.starts_with(ns.as_str()))
    }

    /// Qualified name of the class a call's receiver points at
    pub fn receiver_type(&self, receiver: &Receiver, method: &MethodRecord, class: &ClassRecord) -> Option<String> {
        match receiver {
            Receiver::Implicit | Receiver::This => Some(class.qualified_name.clone()),
            Receiver::Super => class.supertypes.first().cloned(),
            Receiver::Name(name) => self.name_type(name, method, class),
            Receiver::Field { target, name } => {
                if let Some(path) = receiver.dotted_path() {
                    if self.index.class(&path).is_some() {
                        return Some(path);
                    }
                }
                let owner = self.receiver_type(target, method, class)?;
                self.field_type(&owner, name)
            }
            Receiver::Call { target, name, arg_count } => {
                let owner = self.receiver_type(target, method, class)?;
                let callee = self.find_method(&owner, name, Some(*arg_count))?;
                let callee = self.index.method(callee);
                let callee_class = self.index.class(&callee.owning_class)?;
                self.index.qualify_type(&callee.return_type, callee_class)
            }
            Receiver::Typed(type_name) => self.index.qualify_type(type_name, class),
            Receiver::Unknown => None,
        }
    }

    /// A bare name: parameter or local, then field, then a class name
    fn name_type(&self, name: &str, method: &MethodRecord, class: &ClassRecord) -> Option<String> {
        if let Some(declared) = method.local_type(name) {
            return self.index.qualify_type(declared, class);
        }

        if let Some(field) = self.field_type(&class.qualified_name, name) {
            return Some(field);
        }

        let qualified = self.index.qualify_type(name, class)?;
        if self.index.class(&qualified).is_some() || self.is_excluded(&qualified) {
            return Some(qualified);
        }

        self.index.classes_with_simple_name(name).first().cloned()
    }

    /// Declared type of a field on a class, its enclosing classes or its supertypes
    fn field_type(&self, class_name: &str, field: &str) -> Option<String> {
        let mut queue = VecDeque::from([class_name.to_string()]);
        let mut seen = HashSet::new();

        while let Some(current) = queue.pop_front() {
            if !seen.insert(current.clone()) {
                continue;
            }
            let Some(class) = self.index.class(&current) else {
                continue;
            };
            if let Some(declared) = class.field_type(field) {
                return self.index.qualify_type(declared, class);
            }
            queue.extend(class.supertypes.iter().cloned());
            queue.extend(class.enclosing.iter().cloned());
        }

        None
    }

    /// Overload of `name` on `class_name` or an ancestor
    pub fn find_method(&self, class_name: &str, name: &str, arg_count: Option<usize>) -> Option<MethodId> {
        self.ancestors(class_name)
            .iter()
            .find_map(|class| pick_overload(self.index, self.index.methods_named(class, name), arg_count))
    }

    /// Resolve a call target: direct (including inherited), then implementations,
    /// then any class with the same simple name. A resolved method without a body
    /// gives way to an implementation that has one.
    pub fn resolve_callee(&self, class_name: &str, name: &str, arg_count: Option<usize>) -> Option<MethodId> {
        let direct = self.find_method(class_name, name, arg_count);
        if let Some(id) = direct {
            if self.index.method(id).body_present() {
                return Some(id);
            }
        }

        if let Some(id) = self.implementation_of(class_name, name, arg_count) {
            return Some(id);
        }
        if direct.is_some() {
            return direct;
        }

        let simple = simple_name(class_name);
        self.index.classes_with_simple_name(simple)
            .iter()
            .filter(|candidate| candidate.as_str() != class_name)
            .find_map(|candidate| pick_overload(self.index, self.index.methods_named(candidate, name), arg_count))
    }

    /// First implementing or extending class (transitively, sorted by name)
    /// declaring `name` with a body
    pub fn implementation_of(&self, class_name: &str, name: &str, arg_count: Option<usize>) -> Option<MethodId> {
        let mut queue: VecDeque<String> = self.index.implementors(class_name).cloned().collect();
        let mut seen = HashSet::new();

        while let Some(current) = queue.pop_front() {
            if !seen.insert(current.clone()) {
                continue;
            }
            let with_body: Vec<MethodId> = self.index.methods_named(&current, name)
                .iter()
                .copied()
                .filter(|&id| self.index.method(id).body_present())
                .collect();
            if let Some(id) = pick_overload(self.index, &with_body, arg_count) {
                return Some(id);
            }
            queue.extend(self.index.implementors(&current).cloned());
        }

        None
    }

    /// The class itself followed by its indexed supertypes, breadth first
    fn ancestors(&self, class_name: &str) -> Vec<String> {
        let mut order = Vec::new();
        let mut queue = VecDeque::from([class_name.to_string()]);
        let mut seen = HashSet::new();

        while let Some(current) = queue.pop_front() {
            if !seen.insert(current.clone()) {
                continue;
            }
            if let Some(class) = self.index.class(&current) {
                queue.extend(class.supertypes.iter().cloned());
            }
            order.push(current);
        }

        order
    }
}

/// First overload with a matching parameter count, else the first overload
fn pick_overload(index: &SourceIndex, candidates: &[MethodId], arg_count: Option<usize>) -> Option<MethodId> {
    let matching = arg_count.and_then(|count| {
        candidates.iter()
            .copied()
            .find(|&id| index.method(id).parameters.len() == count)
    });
    matching.or_else(|| candidates.first().copied())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AnalysisConfig;
    use crate::core::index::test_support::index_sources;

    fn fixture() -> SourceIndex {
        index_sources(&[
            (
                "app/Orders.java",
                r#"
                package app;
                import java.util.List;
                public class Orders extends Base {
                    private OrderRepository repository;
                    private Registry registry;
                    public void place(Order order, int count) {
                        List<String> names = null;
                        repository.save(order);
                        registry.repos().save(order);
                        this.audit.log();
                    }
                }
                "#,
            ),
            ("app/Base.java", "package app; public class Base { protected Audit audit; void inherited() {} }"),
            ("app/Audit.java", "package app; public class Audit { void log() {} }"),
            ("app/Registry.java", "package app; public class Registry { OrderRepository repos() { return null; } }"),
            (
                "app/OrderRepository.java",
                "package app; public interface OrderRepository { void save(Order o); void save(Order o, boolean flush); }",
            ),
            (
                "app/JpaOrderRepository.java",
                "package app; public class JpaOrderRepository implements OrderRepository { public void save(Order o) {} public void save(Order o, boolean flush) {} }",
            ),
        ])
    }

    #[test]
    fn test_receiver_types() {
        let index = fixture();
        let excluded = AnalysisConfig::default().excluded_namespaces;
        let resolver = ScopeResolver::new(&index, &excluded);

        let class = index.class("app.Orders").unwrap();
        let method = index.method(index.methods_named("app.Orders", "place")[0]);
        let types: Vec<Option<String>> = method.call_sites.iter()
            .map(|site| resolver.receiver_type(&site.receiver, method, class))
            .collect();

        assert_eq!(
            types,
            vec![
                Some("app.OrderRepository".to_string()),
                Some("app.OrderRepository".to_string()),
                Some("app.Registry".to_string()),
                Some("app.Audit".to_string()),
            ]
        );

        assert_eq!(
            resolver.receiver_type(&Receiver::Name("names".into()), method, class).as_deref(),
            Some("java.util.List")
        );
        assert!(resolver.is_excluded("java.util.List"));
        assert_eq!(resolver.receiver_type(&Receiver::Super, method, class).as_deref(), Some("app.Base"));
    }

    #[test]
    fn test_interface_call_resolves_to_implementation() {
        let index = fixture();
        let resolver = ScopeResolver::new(&index, &[]);

        let id = resolver.resolve_callee("app.OrderRepository", "save", Some(2)).unwrap();
        let method = index.method(id);
        assert_eq!(method.owning_class, "app.JpaOrderRepository");
        assert_eq!(method.parameters.len(), 2);

        let inherited = resolver.resolve_callee("app.Orders", "inherited", Some(0)).unwrap();
        assert_eq!(index.method(inherited).owning_class, "app.Base");

        assert!(resolver.resolve_callee("app.Orders", "missing", None).is_none());
    }
}
