//! tickets.rs
//!
//! Печатные билеты: самостоятельный HTML-документ, карточки 2x4 (8 на страницу).
//! QR-код не рендерится локально - в `<img>` подставляется ссылка на внешний
//! сервис с данными `ID|Seat|Name|Tour`.

use crate::config::TicketConfig;
use crate::models::Booking;

pub const TICKETS_PER_PAGE: usize = 8;

pub fn page_count(tickets: usize) -> usize {
    tickets.div_ceil(TICKETS_PER_PAGE)
}

/// Строка, закодированная в QR.
pub fn qr_payload(b: &Booking) -> String {
    format!("{}|{}|{}|{}", b.id, b.seat_id, b.passenger_name, b.tour_name)
}

pub fn qr_url(config: &TicketConfig, b: &Booking) -> String {
    let query = serde_urlencoded::to_string([
        ("size", config.qr_size.as_str()),
        ("data", qr_payload(b).as_str()),
    ])
    .unwrap_or_default();
    format!("{}?{}", config.qr_endpoint, query)
}

fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

const STYLE: &str = r#"
  @page { size: A4; margin: 8mm; }
  body { font-family: Arial, sans-serif; margin: 0; }
  .page { display: grid; grid-template-columns: repeat(2, 1fr); grid-template-rows: repeat(4, 1fr);
          gap: 4mm; height: 277mm; page-break-after: always; }
  .page:last-child { page-break-after: auto; }
  .ticket { border: 1px dashed #333; padding: 3mm; display: flex; justify-content: space-between; }
  .ticket h2 { margin: 0 0 2mm; font-size: 14pt; }
  .ticket p { margin: 0.6mm 0; font-size: 9pt; }
  .ticket .seat { font-size: 20pt; font-weight: bold; }
  .ticket img { width: 28mm; height: 28mm; }
  .status-Paid { color: #0a7a2f; } .status-Partial { color: #b36b00; } .status-Due { color: #b00020; }
"#;

fn card(config: &TicketConfig, b: &Booking) -> String {
    format!(
        r#"<div class="ticket">
  <div>
    <h2>{operator}</h2>
    <p class="seat">{seat}</p>
    <p><b>{name}</b> &middot; {mobile}</p>
    <p>Tour: {tour}</p>
    <p>Total: {total} &middot; Paid: {advance} &middot; Due: {due}</p>
    <p class="status-{status}">{status}</p>
    <p>Agent: {agent} ({code})</p>
    <p>Ref: {id}</p>
  </div>
  <img src="{qr}" alt="QR">
</div>"#,
        operator = escape_html(&config.operator_name),
        seat = escape_html(&b.seat_id),
        name = escape_html(&b.passenger_name),
        mobile = escape_html(&b.mobile),
        tour = escape_html(&b.tour_name),
        total = b.total_fee() - b.discount,
        advance = b.advance,
        due = b.due.max(0),
        status = b.status,
        agent = escape_html(&b.agent_name),
        code = escape_html(&b.agent_code),
        id = b.id,
        qr = escape_html(&qr_url(config, b)),
    )
}

/// HTML для печати: `ceil(N/8)` страниц, на каждой не больше 8 карточек.
pub fn render_batch(config: &TicketConfig, bookings: &[&Booking]) -> String {
    let mut pages = String::new();
    for chunk in bookings.chunks(TICKETS_PER_PAGE) {
        pages.push_str("<section class=\"page\">\n");
        for b in chunk {
            pages.push_str(&card(config, b));
            pages.push('\n');
        }
        pages.push_str("</section>\n");
    }
    format!(
        "<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n<title>Tickets</title>\n<style>{STYLE}</style>\n</head>\n<body onload=\"window.print()\">\n{pages}</body>\n</html>\n"
    )
}

pub fn render_single(config: &TicketConfig, booking: &Booking) -> String {
    render_batch(config, &[booking])
}
