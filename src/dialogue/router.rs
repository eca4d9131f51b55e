//! Pure routing of `(state, event)` pairs to the one step that handles them.
//!
//! Every state has its own arm, so adding a state without deciding which
//! events it accepts does not compile.

use super::state::{CompletionDraft, DialogueState};
use crate::commands::Command;
use dispatch_core::event::{EventKind, MediaAttachment, MediaType};
use dispatch_core::settlement::SettlementMethod;
use dispatch_core::task::GeoPoint;

/// What to do with an event.
#[derive(Debug, PartialEq)]
pub enum Route<'a> {
    /// Abandon whatever is active and return to idle.
    Cancel,
    /// A command. Outside idle only `/start` gets through.
    Command(Command),
    /// A command sent while a wizard is waiting for an answer.
    Busy,
    Step(Step<'a>),
    /// Nothing handles this event in this state.
    Unmatched,
}

/// One transition handler and the input it consumes.
#[derive(Debug, PartialEq)]
pub enum Step<'a> {
    LoginCode(&'a str),
    AssignDescription(&'a str),
    AssignLocation(LocationInput<'a>),
    AssignPayment(&'a str),
    AssignWorker(&'a str),
    AddWorkerName(&'a str),
    AddWorkerChatId(&'a str),
    DebtSelectDebtor(&'a str),
    DebtOtherName(PersonInput<'a>),
    DebtAmount(&'a str),
    DebtReason(&'a str),
    DebtDueDate(&'a str),
    CompleteReport(&'a CompletionDraft, ReportInput<'a>),
    CompleteMedia(&'a CompletionDraft, MediaInput<'a>),
    CompleteSettlement(&'a CompletionDraft, &'a str),
    /// Cash or card amount.
    SettledAmount(&'a CompletionDraft, SettlementMethod, &'a str),
    DebtorName(&'a CompletionDraft, PersonInput<'a>),
    DebtorAmount(&'a CompletionDraft, &'a str),
    DebtorReason(&'a CompletionDraft, &'a str),
    DebtorDueDate(&'a CompletionDraft, &'a str),
}

#[derive(Debug, PartialEq)]
pub enum LocationInput<'a> {
    Point(GeoPoint),
    Text(&'a str),
}

#[derive(Debug, PartialEq)]
pub enum PersonInput<'a> {
    Name(&'a str),
    Contact {
        phone: &'a str,
        name: Option<&'a str>,
    },
}

#[derive(Debug, PartialEq)]
pub enum ReportInput<'a> {
    Text(&'a str),
    Voice(&'a MediaAttachment),
}

#[derive(Debug, PartialEq)]
pub enum MediaInput<'a> {
    Attachment(&'a MediaAttachment),
    Text(&'a str),
}

/// Select the handler for an event in the given state.
pub fn route<'a>(state: &'a DialogueState, kind: &'a EventKind) -> Route<'a> {
    use DialogueState as S;
    use EventKind as E;

    if matches!(kind, E::Cancel) {
        return Route::Cancel;
    }
    if let E::Text(text) = kind {
        if let Some(cmd) = Command::parse(text) {
            return match (state, cmd) {
                (S::Idle, cmd) => Route::Command(cmd),
                (_, Command::Start) => Route::Command(Command::Start),
                _ => Route::Busy,
            };
        }
    }

    let step = match state {
        S::Idle => None,
        S::AdminLogin => text(kind).map(Step::LoginCode),
        S::AssignDescription => text(kind).map(Step::AssignDescription),
        S::AssignLocation => match kind {
            E::Location {
                latitude,
                longitude,
            } => Some(Step::AssignLocation(LocationInput::Point(GeoPoint {
                latitude: *latitude,
                longitude: *longitude,
            }))),
            E::Text(t) => Some(Step::AssignLocation(LocationInput::Text(t))),
            _ => None,
        },
        S::AssignPayment => text(kind).map(Step::AssignPayment),
        S::AssignWorker => text(kind).map(Step::AssignWorker),
        S::AddWorkerName => text(kind).map(Step::AddWorkerName),
        S::AddWorkerChatId => text(kind).map(Step::AddWorkerChatId),
        S::DebtSelectDebtor => text(kind).map(Step::DebtSelectDebtor),
        S::DebtOtherName => person(kind).map(Step::DebtOtherName),
        S::DebtAmount => text(kind).map(Step::DebtAmount),
        S::DebtReason => text(kind).map(Step::DebtReason),
        S::DebtDueDate => text(kind).map(Step::DebtDueDate),
        S::CompleteReport(d) => match kind {
            E::Text(t) => Some(Step::CompleteReport(d, ReportInput::Text(t))),
            E::Attachment(m) if m.media_type == MediaType::Voice => {
                Some(Step::CompleteReport(d, ReportInput::Voice(m)))
            }
            _ => None,
        },
        S::CompleteMedia(d) => match kind {
            E::Attachment(m) if m.media_type != MediaType::Voice => {
                Some(Step::CompleteMedia(d, MediaInput::Attachment(m)))
            }
            E::Text(t) => Some(Step::CompleteMedia(d, MediaInput::Text(t))),
            _ => None,
        },
        S::CompleteSettlement(d) => text(kind).map(|t| Step::CompleteSettlement(d, t)),
        S::CashAmount(d) => text(kind).map(|t| Step::SettledAmount(d, SettlementMethod::Cash, t)),
        S::CardAmount(d) => text(kind).map(|t| Step::SettledAmount(d, SettlementMethod::Card, t)),
        S::DebtorName(d) => person(kind).map(|p| Step::DebtorName(d, p)),
        S::DebtorAmount(d) => text(kind).map(|t| Step::DebtorAmount(d, t)),
        S::DebtorReason(d) => text(kind).map(|t| Step::DebtorReason(d, t)),
        S::DebtorDueDate(d) => text(kind).map(|t| Step::DebtorDueDate(d, t)),
    };

    step.map_or(Route::Unmatched, Route::Step)
}

fn text(kind: &EventKind) -> Option<&str> {
    match kind {
        EventKind::Text(t) => Some(t.as_str()),
        _ => None,
    }
}

fn person(kind: &EventKind) -> Option<PersonInput<'_>> {
    match kind {
        EventKind::Text(t) => Some(PersonInput::Name(t.as_str())),
        EventKind::Contact { phone, name } => Some(PersonInput::Contact {
            phone: phone.as_str(),
            name: name.as_deref(),
        }),
        _ => None,
    }
}
