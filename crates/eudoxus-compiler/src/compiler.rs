//! Compiler driver.
//!
//! Phases, per attempted id width:
//! 1. Reserve header space; compute the parent map.
//! 2. Breadth-first emission: pad each node to the configured alignment,
//!    record its offset, emit it as a path compression node when it
//!    heads an eligible chain and as a low/high demux node otherwise.
//!    The buffer is bounded by the width's largest representable id
//!    after every node.
//! 3. Close the referenced output set over `next_output` chains, pool
//!    unique contents, and emit content records then list records.
//! 4. Patch every reserved id slot from the recorded offsets.
//! 5. Append metadata and finalize the header.
//!
//! With `id_width = 0` the driver starts at one byte and widens on
//! overflow; 1/2/4/8 is honored exactly, overflow becoming a hard error.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};

use eudoxus_bytecode::{HEADER_LEN, Header, IdWidth};
use eudoxus_ir::{Automata, LogFn, NodeId, OutputId, Severity, nop_logger};

use crate::config::{Compiled, Config};
use crate::encode::{Emitter, PcChain};
use crate::error::CompileError;

/// Compile an automaton.
pub fn compile(automata: &Automata, config: Config) -> Result<Compiled, CompileError> {
    compile_with_logger(automata, config, &nop_logger)
}

/// Compile an automaton, reporting progress through `logger`.
pub fn compile_with_logger(
    automata: &Automata,
    config: Config,
    logger: &LogFn,
) -> Result<Compiled, CompileError> {
    if !(config.high_node_weight >= 0.0) {
        return Err(CompileError::InvalidWeight(config.high_node_weight));
    }
    if config.align_to == 0 {
        return Err(CompileError::InvalidAlignment);
    }

    if config.id_width != 0 {
        let width = IdWidth::from_bytes(config.id_width)
            .ok_or(CompileError::InvalidConfiguredWidth(config.id_width))?;
        return compile_with_width(automata, &config, width, logger);
    }

    let mut width = IdWidth::W1;
    loop {
        match compile_with_width(automata, &config, width, logger) {
            Err(CompileError::IdWidthTooSmall { .. }) => match width.widen() {
                Some(wider) => {
                    logger(
                        Severity::Info,
                        &format!(
                            "id width {} too small, widening to {}",
                            width.bytes(),
                            wider.bytes()
                        ),
                    );
                    width = wider;
                }
                None => {
                    return Err(CompileError::IdWidthTooSmall {
                        width: width.bytes(),
                    });
                }
            },
            result => return result,
        }
    }
}

fn compile_with_width(
    automata: &Automata,
    config: &Config,
    width: IdWidth,
    logger: &LogFn,
) -> Result<Compiled, CompileError> {
    let start = automata.start().ok_or(CompileError::NoStartNode)?;
    let max_index = width.max_index();
    let align = config.align_to as usize;

    let mut em = Emitter::new(automata, width, config.high_node_weight);
    em.asm.extend(HEADER_LEN);

    let parents = parent_map(automata);

    // Breadth-first emission, adapted for path compression: a chain's
    // interior nodes are absorbed into the PC encoding and its tail is
    // queued in their place.
    let mut node_offsets: HashMap<NodeId, u64> = HashMap::new();
    let mut queued: HashSet<NodeId> = HashSet::new();
    let mut todo: VecDeque<NodeId> = VecDeque::new();
    todo.push_back(start);
    queued.insert(start);

    while let Some(node) = todo.pop_front() {
        let misalign = em.asm.len() % align;
        if misalign != 0 {
            let pad = align - misalign;
            em.stats.padding += pad as u64;
            em.asm.append_bytes(&vec![0xaa; pad]);
        }
        node_offsets.insert(node, em.asm.len() as u64);

        if let Some(chain) = pc_chain(automata, &parents, node) {
            let end = chain.end;
            em.pc_node(node, &chain);
            if queued.insert(end) {
                todo.push_back(end);
            }
        } else {
            em.demux_node(node)?;
            for edge in &automata.node(node).edges {
                if queued.insert(edge.target) {
                    todo.push_back(edge.target);
                }
            }
        }
        if let Some(default) = automata.node(node).default_target
            && queued.insert(default)
        {
            todo.push_back(default);
        }

        if em.asm.len() as u64 >= max_index {
            return Err(CompileError::IdWidthTooSmall {
                width: width.bytes(),
            });
        }
    }

    complete_outputs(automata, &mut em.outputs_seen);
    let outputs = append_outputs(automata, &mut em, max_index)?;

    em.stats.ids_used += (em.node_refs.len() + em.output_refs.len()) as u64;
    for &(at, node) in &em.node_refs {
        let offset = *node_offsets.get(&node).expect("referenced node was emitted");
        em.asm.patch_id(at, width, offset);
    }
    for &(at, output) in &em.output_refs {
        let offset = *outputs
            .offsets
            .get(&output)
            .expect("referenced output was emitted");
        em.asm.patch_id(at, width, offset);
    }

    let metadata_offset = em.asm.len() as u64;
    for (key, value) in &automata.metadata {
        em.asm.append_u32(key.len() as u32);
        em.asm.append_bytes(key.as_bytes());
        em.asm.append_u32(value.len() as u32);
        em.asm.append_bytes(value);
    }

    let header = Header {
        id_width: width,
        no_advance_no_output: automata.no_advance_no_output,
        align_to: config.align_to,
        num_metadata: automata.metadata.len() as u32,
        num_nodes: node_offsets.len() as u64,
        num_outputs: outputs.offsets.len() as u64,
        num_output_lists: outputs.num_lists,
        start_offset: node_offsets[&start],
        first_output: outputs.first_output,
        first_output_list: outputs.first_output_list,
        metadata_offset,
        total_size: em.asm.len() as u64,
        ..Default::default()
    };
    em.asm.write_at(0, &header.to_bytes());

    logger(
        Severity::Info,
        &format!(
            "compiled {} node(s), {} byte(s), id width {}",
            em.stats.total_nodes(),
            em.asm.len(),
            width.bytes()
        ),
    );

    Ok(Compiled {
        buffer: em.asm.into_vec(),
        config: Config {
            id_width: width.bytes() as u8,
            ..*config
        },
        stats: em.stats,
    })
}

/// Distinct parent nodes of every reachable node, via edges and default
/// targets. Single-parent interior nodes are what path compression may
/// absorb.
fn parent_map(automata: &Automata) -> HashMap<NodeId, BTreeSet<NodeId>> {
    let mut parents: HashMap<NodeId, BTreeSet<NodeId>> = HashMap::new();
    for node in automata.breadth_first() {
        let n = automata.node(node);
        for target in n.edges.iter().map(|edge| edge.target).chain(n.default_target) {
            parents.entry(target).or_default().insert(node);
        }
    }
    parents
}

fn unique_child(automata: &Automata, node: NodeId) -> Option<NodeId> {
    match automata.node(node).edges.as_slice() {
        [edge] if edge.len() == 1 => Some(edge.target),
        _ => None,
    }
}

fn same_defaults(automata: &Automata, a: NodeId, b: NodeId) -> bool {
    let (na, nb) = (automata.node(a), automata.node(b));
    na.default_target == nb.default_target && na.advance_on_default == nb.advance_on_default
}

/// Maximal path-compressible chain headed by `node`, if long enough.
///
/// The chain extends while the next node is output-free, is reached by
/// an advancing single-value edge, has a single-value edge of its own,
/// shares the head's default behavior, and has exactly one parent.
fn pc_chain(
    automata: &Automata,
    parents: &HashMap<NodeId, BTreeSet<NodeId>>,
    node: NodeId,
) -> Option<PcChain> {
    let mut end = node;
    let mut child = unique_child(automata, end)?;
    let mut length = 0usize;

    while length < eudoxus_bytecode::PC_MAX_PATH
        && automata.node(child).first_output.is_none()
        && automata.node(end).edges[0].advance
        && unique_child(automata, child).is_some()
        && same_defaults(automata, end, child)
        && parents.get(&child).is_some_and(|p| p.len() == 1)
    {
        end = child;
        child = unique_child(automata, end)?;
        length += 1;
    }

    if length < eudoxus_bytecode::PC_MIN_PATH {
        return None;
    }

    let mut bytes = Vec::with_capacity(length);
    let mut cur = node;
    while cur != end {
        let edge = &automata.node(cur).edges[0];
        bytes.push(edge.first()?);
        cur = edge.target;
    }
    let advance_on_final = automata.node(end).edges[0].advance;

    Some(PcChain {
        end,
        bytes,
        advance_on_final,
    })
}

/// Add outputs referenced only through `next_output` chains.
fn complete_outputs(automata: &Automata, outputs: &mut BTreeSet<OutputId>) {
    let mut todo: VecDeque<OutputId> = outputs.iter().copied().collect();
    while let Some(output) = todo.pop_front() {
        if let Some(next) = automata.output(output).next_output
            && outputs.insert(next)
        {
            todo.push_back(next);
        }
    }
}

struct OutputSection {
    first_output: u64,
    first_output_list: u64,
    /// Buffer offset each output resolves to: its content record for
    /// single outputs, its list record for chained ones.
    offsets: HashMap<OutputId, u64>,
    num_lists: u64,
}

/// Emit the output section: pooled unique contents first (sorted, so
/// identical payloads share one record), then list records for chained
/// outputs.
fn append_outputs(
    automata: &Automata,
    em: &mut Emitter<'_>,
    max_index: u64,
) -> Result<OutputSection, CompileError> {
    let mut contents: BTreeMap<&[u8], u64> = em
        .outputs_seen
        .iter()
        .map(|&output| (automata.output(output).content.as_slice(), 0))
        .collect();

    let first_output = em.asm.len() as u64;
    for (content, offset) in contents.iter_mut() {
        *offset = em.asm.len() as u64;
        em.asm.append_u32(content.len() as u32);
        em.asm.append_bytes(content);
        if em.asm.len() as u64 >= max_index {
            return Err(CompileError::IdWidthTooSmall {
                width: em.width.bytes(),
            });
        }
    }
    em.stats.ids_used += contents.len() as u64;

    let first_output_list = em.asm.len() as u64;
    let mut offsets: HashMap<OutputId, u64> = HashMap::new();
    let mut num_lists = 0;
    let seen: Vec<OutputId> = em.outputs_seen.iter().copied().collect();
    for output in seen {
        let out = automata.output(output);
        match out.next_output {
            // Single outputs point straight at their content record.
            None => {
                offsets.insert(output, contents[out.content.as_slice()]);
            }
            Some(next) => {
                let at = em.asm.len() as u64;
                em.asm.append_id(em.width, contents[out.content.as_slice()]);
                let slot = em.asm.reserve_id(em.width);
                em.output_refs.push((slot, next));
                offsets.insert(output, at);
                num_lists += 1;
                if em.asm.len() as u64 >= max_index {
                    return Err(CompileError::IdWidthTooSmall {
                        width: em.width.bytes(),
                    });
                }
            }
        }
    }

    Ok(OutputSection {
        first_output,
        first_output_list,
        offsets,
        num_lists,
    })
}
