//! Dependency ordering
//!
//! Nodes are numbered in discovery order; `edges[n]` lists the nodes that
//! must be processed before `n`. [`ordered_groups`] returns strongly
//! connected groups such that every group comes after all groups it points
//! to. Mutually dependent records land in one group, so cycles terminate
//! instead of recursing forever.

/// Strongly connected groups of `edges`, targets before sources
///
/// Members of each group are sorted by node number. Independent groups keep
/// discovery order. Uses an iterative Tarjan walk, so deep chains do not
/// grow the call stack.
pub fn ordered_groups(edges: &[Vec<usize>]) -> Vec<Vec<usize>> {
    let n = edges.len();
    let mut index: Vec<Option<usize>> = vec![None; n];
    let mut low = vec![0usize; n];
    let mut on_stack = vec![false; n];
    let mut stack = Vec::new();
    let mut groups = Vec::new();
    let mut counter = 0usize;

    for root in 0..n {
        if index[root].is_some() {
            continue;
        }

        // (node, next edge to look at)
        let mut work = vec![(root, 0usize)];
        index[root] = Some(counter);
        low[root] = counter;
        counter += 1;
        stack.push(root);
        on_stack[root] = true;

        while let Some(&(node, cursor)) = work.last() {
            if let Some(&target) = edges[node].get(cursor) {
                let top = work.len() - 1;
                work[top].1 += 1;

                match index[target] {
                    None => {
                        index[target] = Some(counter);
                        low[target] = counter;
                        counter += 1;
                        stack.push(target);
                        on_stack[target] = true;
                        work.push((target, 0));
                    }
                    Some(target_index) if on_stack[target] => {
                        low[node] = low[node].min(target_index);
                    }
                    Some(_) => {}
                }
                continue;
            }

            work.pop();
            if let Some(&(parent, _)) = work.last() {
                low[parent] = low[parent].min(low[node]);
            }

            if index[node] == Some(low[node]) {
                let mut group = Vec::new();
                while let Some(member) = stack.pop() {
                    on_stack[member] = false;
                    group.push(member);
                    if member == node {
                        break;
                    }
                }
                group.sort_unstable();
                groups.push(group);
            }
        }
    }

    groups
}
