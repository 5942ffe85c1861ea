// src/core/call_graph/call_chain_tracer.rs
use std::collections::HashSet;
use serde::{Serialize, Deserialize};
use tracing::debug;

use crate::config::AnalysisConfig;
use crate::core::index::{FileId, MethodId, MethodRecord, SourceIndex};
use crate::core::languages::simple_name;
use crate::error::{SpecsworthError, Result};
use super::ScopeResolver;

/// Framework markers worth surfacing on a traced method
const RELEVANT_ANNOTATIONS: &[&str] = &[
    "Transactional", "Cacheable", "CacheEvict", "CachePut", "Async", "Scheduled",
];

/// Maximum length of a rendered call condition
const CONDITION_CHARS: usize = 80;

/// One method in a call-chain trace
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceEntry {
    /// Method whose body this entry shows
    pub method: MethodId,
    /// Depth below the entry method (0 = entry)
    pub depth: usize,
    /// `Class.method`
    pub label: String,
    /// Truncated javadoc description
    pub javadoc_snippet: Option<String>,
    /// Relevant framework annotations, e.g. `@Transactional`
    pub annotations: Vec<String>,
    pub signature: String,
    pub body: String,
    /// Condition guarding the call site that led here
    pub condition: Option<String>,
}

impl TraceEntry {
    pub fn render(&self) -> String {
        let indent = "  ".repeat(self.depth);
        let mut out = String::new();

        if self.depth == 0 {
            out.push_str(&format!("Endpoint method {}:\n", self.label));
        } else {
            out.push_str(&format!("{}-> {}", indent, self.label));
            if let Some(condition) = &self.condition {
                out.push_str(&format!(" (condition: {})", truncate(condition, CONDITION_CHARS)));
            }
            out.push_str(":\n");
        }

        if let Some(javadoc) = &self.javadoc_snippet {
            out.push_str(&format!("{}  /** {} */\n", indent, javadoc));
        }
        if !self.annotations.is_empty() {
            out.push_str(&format!("{}  {}\n", indent, self.annotations.join(" ")));
        }
        out.push_str(&format!("{}  {} {}\n\n", indent, self.signature, self.body));

        out
    }
}

/// Ordered, depth-tagged methods reachable from an endpoint method
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CallChainTrace {
    pub entries: Vec<TraceEntry>,
    /// Characters rendered so far
    pub total_chars: usize,
}

impl CallChainTrace {
    fn push(&mut self, entry: TraceEntry) {
        self.total_chars += entry.render().chars().count();
        self.entries.push(entry);
    }

    pub fn render(&self) -> String {
        let rendered: String = self.entries.iter().map(TraceEntry::render).collect();
        rendered.trim().to_string()
    }

    /// Methods in the trace, entry first
    pub fn methods(&self) -> impl Iterator<Item = MethodId> + '_ {
        self.entries.iter().map(|entry| entry.method)
    }
}

/// An outbound call whose target has been resolved
#[derive(Debug, Clone)]
struct ResolvedCall {
    callee: MethodId,
    condition: Option<String>,
}

/// A pending node on the traversal stack
struct Frame {
    method: MethodId,
    depth: usize,
    condition: Option<String>,
}

/// Visit identity: declaring file, declaration offset, method name
type VisitKey = (FileId, usize, String);

/// Depth- and size-bounded traversal of resolved calls from an entry method
pub struct CallChainTracer<'a> {
    index: &'a SourceIndex,
    scope: ScopeResolver<'a>,
    max_depth: usize,
    max_chars: usize,
    javadoc_chars: usize,
}

impl<'a> CallChainTracer<'a> {
    pub fn new(index: &'a SourceIndex, config: &'a AnalysisConfig) -> Self {
        Self {
            index,
            scope: ScopeResolver::new(index, &config.excluded_namespaces),
            max_depth: config.call_chain_depth,
            max_chars: config.call_chain_max_chars,
            javadoc_chars: config.javadoc_snippet_chars,
        }
    }

    /// Pre-order trace from `entry`.
    ///
    /// Nodes are marked visited when popped, so each declaration appears at
    /// most once and recursive call graphs terminate. Once the rendered length
    /// exceeds the character budget no further node is appended.
    pub fn resolve_chain(&self, entry: MethodId) -> Result<CallChainTrace> {
        let entry_record = self.index.get_method(entry)
            .ok_or_else(|| SpecsworthError::Resolution(format!("unknown method id {}", entry)))?;

        let mut trace = CallChainTrace::default();
        let mut visited: HashSet<VisitKey> = HashSet::new();
        let mut stack = vec![Frame { method: entry, depth: 0, condition: None }];

        // Interface endpoint methods borrow the body of their implementation
        let entry_body = match entry_record.body_present() {
            true => entry,
            false => self.single_implementation(entry_record).unwrap_or(entry),
        };
        if entry_body != entry {
            visited.insert(visit_key(self.index.method(entry_body)));
        }

        while let Some(frame) = stack.pop() {
            let record = self.index.method(frame.method);
            if !visited.insert(visit_key(record)) {
                continue;
            }
            if trace.total_chars > self.max_chars {
                debug!("Call chain budget exhausted at {}.{}", record.owning_class, record.name);
                break;
            }

            let shown = if frame.method == entry { entry_body } else { frame.method };
            trace.push(self.entry_for(frame.method, shown, &frame));

            if frame.depth >= self.max_depth {
                continue;
            }

            let calls = self.outbound_calls(shown)?;
            for call in calls.into_iter().rev() {
                stack.push(Frame {
                    method: call.callee,
                    depth: frame.depth + 1,
                    condition: call.condition,
                });
            }
        }

        Ok(trace)
    }

    /// `method` names the node, `shown_id` supplies the body
    fn entry_for(&self, method: MethodId, shown_id: MethodId, frame: &Frame) -> TraceEntry {
        let record = self.index.method(method);
        let shown = self.index.method(shown_id);
        let annotations = record.annotations.iter()
            .chain(shown.annotations.iter())
            .filter(|a| RELEVANT_ANNOTATIONS.contains(&a.name.as_str()))
            .map(|a| format!("@{}", a.name))
            .fold(Vec::new(), |mut acc, a| {
                if !acc.contains(&a) {
                    acc.push(a);
                }
                acc
            });

        let javadoc_snippet = record.javadoc_text()
            .or_else(|| shown.javadoc_text())
            .map(|text| truncate(&text.replace('\n', " "), self.javadoc_chars));

        TraceEntry {
            method: shown_id,
            depth: frame.depth,
            label: format!("{}.{}", simple_name(&record.owning_class), record.name),
            javadoc_snippet,
            annotations,
            signature: shown.signature(),
            body: shown.body.clone().unwrap_or_else(|| "{}".to_string()),
            condition: frame.condition.clone(),
        }
    }

    /// Resolved outbound calls of a method, de-duplicated by (target class, name)
    fn outbound_calls(&self, method: MethodId) -> Result<Vec<ResolvedCall>> {
        let record = self.index.method(method);
        let class = self.index.class(&record.owning_class).ok_or_else(|| {
            SpecsworthError::Resolution(format!("method {} has no owning class {}", record.name, record.owning_class))
        })?;

        let mut seen = HashSet::new();
        let mut calls = Vec::new();

        for site in &record.call_sites {
            let Some(target) = self.scope.receiver_type(&site.receiver, record, class) else {
                continue;
            };
            if self.scope.is_excluded(&target) {
                continue;
            }
            if !seen.insert((target.clone(), site.name.clone())) {
                continue;
            }
            let Some(callee) = self.scope.resolve_callee(&target, &site.name, site.arg_count) else {
                continue;
            };

            calls.push(ResolvedCall {
                callee,
                condition: site.condition.clone(),
            });
        }

        Ok(calls)
    }

    /// The implementation of an abstract method when exactly one class provides it
    fn single_implementation(&self, method: &MethodRecord) -> Option<MethodId> {
        let arg_count = method.parameters.len();
        let candidates: Vec<MethodId> = self.index.implementors(&method.owning_class)
            .flat_map(|class| self.index.methods_named(class, &method.name).iter().copied())
            .filter(|&id| {
                let candidate = self.index.method(id);
                candidate.body_present() && candidate.parameters.len() == arg_count
            })
            .collect();

        match candidates.as_slice() {
            [only] => Some(*only),
            _ => None,
        }
    }
}

fn visit_key(method: &MethodRecord) -> VisitKey {
    (method.position.file, method.position.byte_offset, method.name.clone())
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let kept: String = text.chars().take(max_chars).collect();
        format!("{}...", kept)
    }
}
