//! reports.rs
//!
//! Сводные отчеты по снимку состояния:
//! - по турам (занятость автобуса, выручка, собрано, долг, расходы, чистый итог);
//! - по агентам (число броней, продано, собрано);
//! - счетчики по статусам оплаты и расходы по категориям.
//!
//! Считается только в памяти, без запросов к БД.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::models::{Booking, Expense, PaymentStatus, Tour};
use crate::services::layout::SEATS_PER_BUS;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ReportQuery {
    pub tour: Option<String>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl ReportQuery {
    fn tour_matches(&self, tour: Option<&str>) -> bool {
        match self.tour.as_deref().filter(|t| !t.is_empty()) {
            Some(wanted) => tour == Some(wanted),
            None => true,
        }
    }

    fn date_matches(&self, date: NaiveDate) -> bool {
        self.from.is_none_or(|from| date >= from) && self.to.is_none_or(|to| date <= to)
    }

    pub fn booking_matches(&self, b: &Booking) -> bool {
        self.tour_matches(Some(&b.tour_name)) && self.date_matches(b.created_at.date_naive())
    }

    pub fn expense_matches(&self, e: &Expense) -> bool {
        self.tour_matches(e.tour_name.as_deref()) && self.date_matches(e.date)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Totals {
    pub bookings: usize,
    /// Сумма к оплате после скидок
    pub gross: i64,
    pub collected: i64,
    /// Только положительный остаток; переплата долг не уменьшает
    pub outstanding: i64,
    pub discounts: i64,
}

impl Totals {
    fn add(&mut self, b: &Booking) {
        self.bookings += 1;
        self.gross += b.total_fee() - b.discount;
        self.collected += b.advance;
        self.outstanding += b.due.max(0);
        self.discounts += b.discount;
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TourReport {
    pub tour_name: String,
    pub fee: i64,
    pub seats_booked: usize,
    pub seats_total: usize,
    #[serde(flatten)]
    pub totals: Totals,
    pub expenses: i64,
    /// collected - expenses
    pub net: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AgentReport {
    pub agent_code: String,
    pub agent_name: String,
    #[serde(flatten)]
    pub totals: Totals,
    pub expenses: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
    pub paid: usize,
    pub partial: usize,
    pub due: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub overall: Totals,
    pub by_status: StatusCounts,
    pub tours: Vec<TourReport>,
    pub agents: Vec<AgentReport>,
    pub expenses_by_category: BTreeMap<String, i64>,
    pub total_expenses: i64,
    pub net: i64,
}

fn agent_slot(agents: &mut Vec<AgentReport>, code: &str, name: &str) -> usize {
    match agents.iter().position(|a| a.agent_code.eq_ignore_ascii_case(code)) {
        Some(i) => i,
        None => {
            agents.push(AgentReport {
                agent_code: code.to_string(),
                agent_name: name.to_string(),
                totals: Totals::default(),
                expenses: 0,
            });
            agents.len() - 1
        }
    }
}

pub fn summarize(tours: &[Tour], bookings: &[Booking], expenses: &[Expense], query: &ReportQuery) -> Summary {
    let bookings: Vec<&Booking> = bookings.iter().filter(|b| query.booking_matches(b)).collect();
    let expenses: Vec<&Expense> = expenses.iter().filter(|e| query.expense_matches(e)).collect();

    let mut overall = Totals::default();
    let mut by_status = StatusCounts::default();
    for b in &bookings {
        overall.add(b);
        match b.status {
            PaymentStatus::Paid => by_status.paid += 1,
            PaymentStatus::Partial => by_status.partial += 1,
            PaymentStatus::Due => by_status.due += 1,
        }
    }

    let tour_reports = tours
        .iter()
        .filter(|t| query.tour_matches(Some(&t.name)))
        .map(|t| {
            let mut totals = Totals::default();
            for b in bookings.iter().filter(|b| b.tour_name == t.name) {
                totals.add(b);
            }
            let spent: i64 = expenses
                .iter()
                .filter(|e| e.tour_name.as_deref() == Some(t.name.as_str()))
                .map(|e| e.amount)
                .sum();
            TourReport {
                tour_name: t.name.clone(),
                fee: t.fee,
                seats_booked: totals.bookings,
                seats_total: SEATS_PER_BUS,
                net: totals.collected - spent,
                totals,
                expenses: spent,
            }
        })
        .collect();

    // агенты в порядке первого появления кода (без учета регистра)
    let mut agents: Vec<AgentReport> = Vec::new();
    for b in &bookings {
        let i = agent_slot(&mut agents, &b.agent_code, &b.agent_name);
        agents[i].totals.add(b);
    }
    for e in &expenses {
        let i = agent_slot(&mut agents, &e.agent_code, &e.agent_name);
        agents[i].expenses += e.amount;
    }

    let mut expenses_by_category = BTreeMap::new();
    for e in &expenses {
        *expenses_by_category.entry(e.category.clone()).or_insert(0) += e.amount;
    }
    let total_expenses: i64 = expenses.iter().map(|e| e.amount).sum();

    Summary {
        net: overall.collected - total_expenses,
        overall,
        by_status,
        tours: tour_reports,
        agents,
        expenses_by_category,
        total_expenses,
    }
}
