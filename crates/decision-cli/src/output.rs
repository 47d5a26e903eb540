//! Graph output sinks.

use decision_core::Result;
use decision_graph::TaskGraph;
use std::io::Write;
use std::path::Path;

/// Write the graph as pretty JSON, with a trailing newline.
pub fn write_graph(writer: &mut impl Write, graph: &TaskGraph) -> Result<()> {
    let json = graph.to_json_pretty()?;
    writer.write_all(json.as_bytes())?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    Ok(())
}

/// Write the graph to `path`, replacing any existing file.
pub fn write_graph_file(path: &Path, graph: &TaskGraph) -> Result<()> {
    let mut file = std::fs::File::create(path)?;
    write_graph(&mut file, graph)
}
