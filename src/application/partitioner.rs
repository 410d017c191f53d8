// Connectivity partitioner
// Splits a problem into independent sub-problems along the connected components
// of the variable co-occurrence graph induced by its constraints

use std::collections::HashMap;

use crate::domain::{LinearExpression, Problem, Result, SolverError};

/// Disjoint-set forest over variable indices with union by rank and path compression
///
/// Sets are created lazily; a variable that was never added is not a member.
#[derive(Debug, Clone)]
pub struct UnionFind {
    parent: Vec<usize>,
    rank: Vec<u8>,
    member: Vec<bool>,
}

impl UnionFind {
    pub fn new(size: usize) -> Self {
        Self {
            parent: (0..size).collect(),
            rank: vec![0; size],
            member: vec![false; size],
        }
    }

    pub fn make_set(&mut self, x: usize) {
        if !self.member[x] {
            self.member[x] = true;
            self.parent[x] = x;
            self.rank[x] = 0;
        }
    }

    pub fn contains(&self, x: usize) -> bool {
        self.member.get(x).copied().unwrap_or(false)
    }

    pub fn find(&mut self, x: usize) -> usize {
        let mut root = x;
        while self.parent[root] != root {
            root = self.parent[root];
        }

        let mut node = x;
        while self.parent[node] != root {
            let next = self.parent[node];
            self.parent[node] = root;
            node = next;
        }

        root
    }

    pub fn union(&mut self, a: usize, b: usize) {
        let a = self.find(a);
        let b = self.find(b);
        if a == b {
            return;
        }

        match self.rank[a].cmp(&self.rank[b]) {
            std::cmp::Ordering::Greater => self.parent[b] = a,
            std::cmp::Ordering::Less => self.parent[a] = b,
            std::cmp::Ordering::Equal => {
                self.parent[b] = a;
                self.rank[a] += 1;
            }
        }
    }
}

/// A group of connected components solved by one physical backend call
#[derive(Debug, Clone)]
pub struct Partition {
    /// Position in discovery order
    pub index: usize,
    pub problem: Problem,
    /// Position of each of `problem.constraints` in the original problem
    pub constraint_origin: Vec<usize>,
    /// Number of connected components grouped into this partition
    pub components: usize,
}

/// Outcome of partitioning a problem
#[derive(Debug)]
pub enum Partitioning {
    /// Nothing to split; the original problem, handed back as is
    Whole { problem: Problem, components: usize },
    /// Independent partitions in discovery order
    Split {
        partitions: Vec<Partition>,
        components: usize,
    },
}

impl Partitioning {
    pub fn components(&self) -> usize {
        match self {
            Partitioning::Whole { components, .. } | Partitioning::Split { components, .. } => {
                *components
            }
        }
    }

    pub fn num_partitions(&self) -> usize {
        match self {
            Partitioning::Whole { .. } => 1,
            Partitioning::Split { partitions, .. } => partitions.len(),
        }
    }
}

/// Partition `problem` into groups of at most `partition_size` connected components
///
/// Components are discovered in ascending order of their lowest variable index and
/// grouped greedily in that order. Constraints without terms belong to no partition.
/// Every objective variable must occur in some constraint.
pub fn partition(problem: Problem, partition_size: usize) -> Result<Partitioning> {
    let partition_size = partition_size.max(1);
    let mut sets = UnionFind::new(problem.variable_count);

    for (position, constraint) in problem.constraints.iter().enumerate() {
        let mut variables = constraint.expression.variables();
        let Some(first) = variables.next() else {
            continue;
        };
        check_range(&problem, first, position)?;
        sets.make_set(first);
        for variable in variables {
            check_range(&problem, variable, position)?;
            sets.make_set(variable);
            sets.union(first, variable);
        }
    }

    if let Some(objective) = &problem.objective {
        if let Some(variable) = objective.variables().find(|&v| !sets.contains(v)) {
            return Err(SolverError::UnboundVariable { variable });
        }
    }

    // Root of each component -> partition index
    let mut group_of: HashMap<usize, usize> = HashMap::new();
    let mut group_components: Vec<usize> = Vec::new();
    for variable in 0..problem.variable_count {
        if !sets.contains(variable) {
            continue;
        }
        let root = sets.find(variable);
        if group_of.contains_key(&root) {
            continue;
        }
        let joins_open_group = group_components
            .last()
            .is_some_and(|&grouped| grouped < partition_size);
        if joins_open_group {
            if let Some(grouped) = group_components.last_mut() {
                *grouped += 1;
            }
        } else {
            group_components.push(1);
        }
        group_of.insert(root, group_components.len() - 1);
    }

    let components = group_of.len();
    if group_components.len() <= 1 {
        return Ok(Partitioning::Whole {
            problem,
            components,
        });
    }

    let Problem {
        direction,
        objective,
        constraints,
        variable_types,
        variable_count,
    } = problem;

    let mut partitions: Vec<Partition> = group_components
        .iter()
        .enumerate()
        .map(|(index, &components)| Partition {
            index,
            problem: Problem {
                direction,
                objective: None,
                constraints: Vec::new(),
                variable_types: variable_types.clone(),
                variable_count,
            },
            constraint_origin: Vec::new(),
            components,
        })
        .collect();

    for (position, constraint) in constraints.into_iter().enumerate() {
        let Some(first) = constraint.expression.variables().next() else {
            continue;
        };
        let group = group_of[&sets.find(first)];
        let target = &mut partitions[group];
        target.problem.constraints.push(constraint);
        target.constraint_origin.push(position);
    }

    if let Some(objective) = objective {
        for term in objective.terms {
            let group = group_of[&sets.find(term.variable)];
            partitions[group]
                .problem
                .objective
                .get_or_insert_with(LinearExpression::new)
                .terms
                .push(term);
        }
    }

    Ok(Partitioning::Split {
        partitions,
        components,
    })
}

fn check_range(problem: &Problem, variable: usize, position: usize) -> Result<()> {
    if variable < problem.variable_count {
        Ok(())
    } else {
        Err(SolverError::VariableOutOfRange {
            variable,
            variable_count: problem.variable_count,
            location: format!("constraint {}", position),
        })
    }
}
