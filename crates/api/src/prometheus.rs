//! Prometheus text exposition
//!
//! Renders the ingress and writer counters in the text format scrapers
//! expect. No global registry: the counters live with their components
//! and this module only formats snapshots.

use hepflow_sinks::WriterStats;
use hepflow_sources::ListenerSnapshot;

/// Render all counters as one exposition document.
pub(crate) fn render(listener: &ListenerSnapshot, writer: &WriterStats) -> String {
    let mut out = String::with_capacity(1024);

    counter(
        &mut out,
        "hepflow_packets_received_total",
        "HEP packets received off the wire",
        listener.packets_received,
    );
    counter(
        &mut out,
        "hepflow_bytes_received_total",
        "Raw bytes received",
        listener.bytes_received,
    );
    counter(
        &mut out,
        "hepflow_decode_errors_total",
        "Packets dropped because they failed to decode",
        listener.decode_errors,
    );
    counter(
        &mut out,
        "hepflow_packets_dropped_total",
        "Decoded packets the writer refused",
        listener.packets_dropped,
    );
    counter(
        &mut out,
        "hepflow_socket_errors_total",
        "Socket-level listener errors",
        listener.socket_errors,
    );
    gauge(
        &mut out,
        "hepflow_connections_active",
        "Open TCP capture connections",
        listener.connections_active,
    );
    counter(
        &mut out,
        "hepflow_connections_total",
        "TCP capture connections accepted",
        listener.connections_total,
    );

    counter(
        &mut out,
        "hepflow_writer_received_total",
        "Packets accepted by the writer",
        writer.received,
    );
    counter(
        &mut out,
        "hepflow_writer_written_total",
        "Packets persisted by the writer",
        writer.written,
    );
    counter(
        &mut out,
        "hepflow_writer_bytes_written_total",
        "Bytes persisted by the writer",
        writer.bytes_written,
    );
    counter(
        &mut out,
        "hepflow_writer_errors_total",
        "Writer flush errors",
        writer.errors,
    );

    out
}

fn counter(out: &mut String, name: &str, help: &str, value: u64) {
    metric(out, name, help, "counter", value);
}

fn gauge(out: &mut String, name: &str, help: &str, value: u64) {
    metric(out, name, help, "gauge", value);
}

fn metric(out: &mut String, name: &str, help: &str, kind: &str, value: u64) {
    out.push_str(&format!(
        "# HELP {name} {help}\n# TYPE {name} {kind}\n{name} {value}\n"
    ));
}
