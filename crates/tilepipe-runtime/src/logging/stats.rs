use alloc::{format, string::String, vec::Vec};
use core::fmt::Display;

use crate::pipe::PipeKind;

/// Counters of a single pipe during a kernel.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PipeCounters {
    /// Operations executed.
    pub ops: usize,
    /// Fences signaled.
    pub signals: usize,
    /// Fences waited on.
    pub waits: usize,
    /// Scheduling steps where the pipe had work but was blocked on a fence.
    pub stalls: usize,
}

/// Counters of every pipe of a core during a kernel.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct PipeStats {
    counters: [PipeCounters; PipeKind::COUNT],
}

impl PipeStats {
    /// Counters of the given pipe.
    pub fn get(&self, pipe: PipeKind) -> &PipeCounters {
        &self.counters[pipe.index()]
    }

    pub(crate) fn get_mut(&mut self, pipe: PipeKind) -> &mut PipeCounters {
        &mut self.counters[pipe.index()]
    }

    /// Total number of operations executed by all pipes.
    pub fn total_ops(&self) -> usize {
        self.counters.iter().map(|c| c.ops).sum()
    }

    /// Whether nothing was executed.
    pub fn is_empty(&self) -> bool {
        self.counters
            .iter()
            .all(|c| c.ops == 0 && c.signals == 0 && c.waits == 0)
    }

    /// Add the counters of another kernel block.
    pub fn merge(&mut self, other: &PipeStats) {
        for (acc, item) in self.counters.iter_mut().zip(other.counters.iter()) {
            acc.ops += item.ops;
            acc.signals += item.signals;
            acc.waits += item.waits;
            acc.stalls += item.stalls;
        }
    }
}

impl Display for PipeStats {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let headers = ["Pipe", "Ops", "Signals", "Waits", "Stalls"];

        let rows: Vec<[String; 5]> = PipeKind::ALL
            .iter()
            .map(|pipe| {
                let c = self.get(*pipe);
                [
                    format!("{pipe}"),
                    format!("{}", c.ops),
                    format!("{}", c.signals),
                    format!("{}", c.waits),
                    format!("{}", c.stalls),
                ]
            })
            .collect();

        let mut widths = headers.map(|h| h.len());
        for row in rows.iter() {
            for (width, cell) in widths.iter_mut().zip(row.iter()) {
                *width = usize::max(*width, cell.len());
            }
        }

        let line_length = widths.iter().sum::<usize>() + 3 * widths.len() + 1;
        let write_line = |char: &str, f: &mut core::fmt::Formatter<'_>| {
            writeln!(f, "|{}|", char.repeat(line_length - 2))
        };

        write_line("⎺", f)?;
        for (header, width) in headers.iter().zip(widths.iter()) {
            write!(f, "| {header:<width$} ")?;
        }
        writeln!(f, "|")?;
        write_line("⎼", f)?;

        for row in rows {
            for (cell, width) in row.iter().zip(widths.iter()) {
                write!(f, "| {cell:<width$} ")?;
            }
            writeln!(f, "|")?;
        }

        write_line("⎯", f)
    }
}
