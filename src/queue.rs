//! Execution ordering with cycle detection
//!
//! A weighted depth-first walk over the provider graph. Each provider's
//! weight is one plus the weights of its distinct dependency providers, so
//! every consumer weighs strictly more than anything it depends on and
//! ascending-weight order is a valid topological order. Broadly
//! depended-upon providers accumulate into their consumers and therefore
//! sort early; the stable sort keeps registration order among equal
//! weights.

use crate::error::{InjectError, InjectResult};
use crate::registry::{Provider, Registry};
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum VisitState {
	/// On the current recursion path; reaching it again closes a cycle.
	OnStack,
	/// Fully visited, weight final.
	Settled,
}

struct QueueNode {
	provider: usize,
	weight: u64,
	state: VisitState,
}

struct QueueBuilder<'graph> {
	providers: &'graph [Arc<Provider>],
	registry: &'graph Registry,
	nodes: Vec<QueueNode>,
	/// Provider index → node position.
	index: HashMap<usize, usize>,
	/// Provider names along the current recursion path, for cycle
	/// diagnostics.
	path: Vec<String>,
}

impl QueueBuilder<'_> {
	/// Visit a provider, returning its node position, or `None` when it is
	/// already done and contributes nothing to this cycle.
	fn visit(&mut self, provider_idx: usize) -> InjectResult<Option<usize>> {
		let provider = Arc::clone(&self.providers[provider_idx]);
		if provider.is_done() {
			return Ok(None);
		}

		if let Some(&position) = self.index.get(&provider_idx) {
			if self.nodes[position].state == VisitState::Settled {
				return Ok(Some(position));
			}
			let mut path = self.path.clone();
			path.push(provider.name.clone());
			return Err(InjectError::Cycle { path });
		}

		self.path.push(provider.name.clone());
		let position = self.nodes.len();
		self.nodes.push(QueueNode {
			provider: provider_idx,
			weight: 1,
			state: VisitState::OnStack,
		});
		self.index.insert(provider_idx, position);

		// Each distinct dependency provider is counted once, even when it
		// is reached through several keys.
		let mut visited_owners: Vec<usize> = Vec::new();
		for key in &provider.requires {
			let owner = self
				.registry
				.lookup(key)
				.ok_or_else(|| InjectError::MissingDependency {
					provider: provider.name.clone(),
					dependency: key.to_string(),
				})?
				.owner;
			if visited_owners.contains(&owner) {
				continue;
			}
			visited_owners.push(owner);
			if let Some(dependency_position) = self.visit(owner)? {
				self.nodes[position].weight += self.nodes[dependency_position].weight;
			}
		}

		self.nodes[position].state = VisitState::Settled;
		self.path.pop();
		Ok(Some(position))
	}
}

/// Build the execution order for one cycle: every provider not yet done,
/// sorted so dependencies run before their consumers.
pub(crate) fn build_queue(
	providers: &[Arc<Provider>],
	registry: &Registry,
) -> InjectResult<Vec<usize>> {
	let mut builder = QueueBuilder {
		providers,
		registry,
		nodes: Vec::new(),
		index: HashMap::new(),
		path: Vec::new(),
	};
	for provider_idx in 0..providers.len() {
		builder.visit(provider_idx)?;
	}

	let mut nodes = builder.nodes;
	nodes.sort_by_key(|node| node.weight);
	Ok(nodes.into_iter().map(|node| node.provider).collect())
}
