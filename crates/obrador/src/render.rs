// SPDX-FileCopyrightText: 2026 Obrador Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Terminal and JSON output for operator commands.

use std::io::IsTerminal;

use colored::Colorize;
use obrador_core::types::{ChatRole, Folio, InboxEntry, SessionDetail};
use obrador_core::Priority;
use obrador_intake::Materialization;
use serde::Serialize;

/// Output mode chosen from `--json` / `--plain` and the terminal.
#[derive(Debug, Clone, Copy)]
pub struct Output {
    pub json: bool,
    pub color: bool,
}

impl Output {
    pub fn new(json: bool, plain: bool) -> Self {
        Self {
            json,
            color: !plain && std::io::stdout().is_terminal(),
        }
    }

    pub fn print_json<T: Serialize>(&self, value: &T) {
        println!(
            "{}",
            serde_json::to_string_pretty(value).unwrap_or_else(|_| "{}".to_string())
        );
    }

    fn header(&self, title: &str) {
        println!();
        if self.color {
            println!("  {}", title.bold());
        } else {
            println!("  {title}");
        }
        println!("  {}", "-".repeat(50));
    }
}

/// One inbox line, without colors.
pub fn inbox_line(entry: &InboxEntry) -> String {
    let flag = if entry.needs_human { "!" } else { " " };
    let name = entry.customer_name.as_deref().unwrap_or("(sin nombre)");
    let date = entry
        .draft_summary
        .delivery_date
        .map(|d| d.to_string())
        .unwrap_or_else(|| "----------".to_string());
    format!(
        "{flag} {:<8} {:<24} {:<14} {date} ${:>9.2}  {}",
        entry.priority.to_string(),
        truncate(name, 24),
        entry.customer_phone,
        entry.draft_summary.grand_total,
        entry.id,
    )
}

pub fn print_inbox(out: Output, entries: &[InboxEntry]) {
    if out.json {
        out.print_json(&entries);
        return;
    }
    out.header(&format!("inbox ({} active)", entries.len()));
    for entry in entries {
        let line = inbox_line(entry);
        if !out.color {
            println!("  {line}");
        } else if entry.needs_human {
            println!("  {}", line.red());
        } else if entry.priority == Priority::Urgente {
            println!("  {}", line.yellow());
        } else {
            println!("  {line}");
        }
    }
    println!();
}

pub fn print_session(out: Output, detail: &SessionDetail) {
    if out.json {
        out.print_json(detail);
        return;
    }
    let s = &detail.session;
    out.header(&format!("session {}", s.id));
    println!("    Status:    {}", s.status);
    println!(
        "    Customer:  {} ({})",
        s.customer_name.as_deref().unwrap_or("(sin nombre)"),
        s.customer_phone
    );
    println!("    Priority:  {}", s.priority);
    println!("    Needs human: {}", if s.needs_human { "yes" } else { "no" });
    if let Some(reason) = s.discard_reason.as_deref() {
        println!("    Discarded: {reason}");
    }
    if let Some(folio) = s.folio_number {
        println!("    Folio:     #{folio}");
    }
    println!(
        "    Draft:     {}",
        serde_json::to_string(&s.draft).unwrap_or_default()
    );
    println!();
    for turn in &detail.chat_history {
        let who = match turn.role {
            ChatRole::User => "cliente",
            ChatRole::Assistant => "asistente",
        };
        println!("    [{}] {who}: {}", turn.created_at, turn.content);
    }
    println!();
}

pub fn print_folio(out: Output, folio: &Folio) {
    if out.json {
        out.print_json(folio);
        return;
    }
    let t = &folio.order.totals;
    out.header(&format!("folio #{}", folio.folio_number));
    println!(
        "    Cliente:   {} ({})",
        folio.order.client_name.as_deref().unwrap_or("-"),
        folio.order.client_phone.as_deref().unwrap_or("-")
    );
    println!(
        "    Entrega:   {} {}",
        folio
            .order
            .delivery_date
            .map(|d| d.to_string())
            .unwrap_or_default(),
        folio.order.delivery_time.as_deref().unwrap_or("")
    );
    println!("    Subtotal:  {:.2}", t.subtotal);
    println!("    Comisión:  {:.2}", t.commission);
    println!("    Total:     {:.2}", t.grand_total);
    println!("    Saldo:     {:.2}", t.balance);
    println!(
        "    Estado:    {} / {}",
        folio.production_status, folio.payment_status
    );
    println!();
}

pub fn print_materialization(out: Output, m: &Materialization) {
    if out.json {
        out.print_json(m);
        return;
    }
    print_folio(out, &m.folio);
    println!(
        "    Commission {:.2} (raw {:.2}, {})",
        m.commission.rounded_amount,
        m.commission.raw_amount,
        if m.commission.applied_to_customer {
            "charged to customer"
        } else {
            "absorbed"
        }
    );
    println!();
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let cut: String = s.chars().take(max.saturating_sub(1)).collect();
        format!("{cut}…")
    }
}
