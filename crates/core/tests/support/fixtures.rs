//! Fixture builders and wired services

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use timesheet_core::{
    LessonEventReconciler, OperationContext, TimesheetBuilder, TimesheetService,
    TimesheetStateMachine,
};
use timesheet_domain::{
    AutoCreateFlagActivityLog, Lesson, LessonHours, LessonSchedulingStatus, OtherWorkingHours,
    Requester, Role, StaffTransportationExpense, Timesheet, TimesheetStatus, TransportationType,
};

use super::publishers::RecordingPublisher;
use super::repositories::{
    MockAutoCreateSettings, MockConfirmationWindow, MockLessonRepository,
    MockStaffExpenseRepository, MockTimesheetStore,
};

pub const LOCATION: &str = "loc-1";

/// 2023-06-10 12:00 JST
pub fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2023, 6, 10, 3, 0, 0).unwrap()
}

pub fn date(month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2023, month, day).unwrap()
}

/// A lesson at `hour` UTC on 2023-06-`day`.
pub fn lesson(
    id: &str,
    status: LessonSchedulingStatus,
    teachers: &[&str],
    day: u32,
    hour: u32,
) -> Lesson {
    Lesson {
        lesson_id: id.to_string(),
        location_id: LOCATION.to_string(),
        start_time: Utc.with_ymd_and_hms(2023, 6, day, hour, 0, 0).unwrap(),
        scheduling_status: status,
        teacher_ids: teachers.iter().map(ToString::to_string).collect(),
    }
}

pub fn published(id: &str, teachers: &[&str], day: u32) -> Lesson {
    lesson(id, LessonSchedulingStatus::Published, teachers, day, 1)
}

/// A saved timesheet with lesson-hours for `lessons`.
pub fn saved_timesheet(
    id: &str,
    staff_id: &str,
    day: NaiveDate,
    status: TimesheetStatus,
    lessons: &[(&str, bool)],
) -> Timesheet {
    let mut ts = Timesheet::new_draft(staff_id, LOCATION, day);
    ts.id = id.to_string();
    ts.status = status;
    ts.is_created = true;
    ts.lesson_hours = lessons
        .iter()
        .map(|(lesson_id, flag_on)| {
            let mut lh = LessonHours::new(id, *lesson_id, *flag_on);
            lh.is_created = true;
            lh
        })
        .collect();
    ts
}

pub fn other_hours(hour: u32) -> OtherWorkingHours {
    OtherWorkingHours::new(
        "config-office",
        Utc.with_ymd_and_hms(2023, 6, 5, hour, 0, 0).unwrap(),
        Utc.with_ymd_and_hms(2023, 6, 5, hour + 1, 30, 0).unwrap(),
        "filing",
    )
}

pub fn flag_log(staff_id: &str, flag_on: bool) -> AutoCreateFlagActivityLog {
    AutoCreateFlagActivityLog {
        id: format!("log-{staff_id}"),
        staff_id: staff_id.to_string(),
        flag_on,
        change_time: Utc.with_ymd_and_hms(2023, 1, 1, 0, 0, 0).unwrap(),
    }
}

pub fn default_route(staff_id: &str) -> StaffTransportationExpense {
    StaffTransportationExpense {
        id: format!("route-{staff_id}"),
        staff_id: staff_id.to_string(),
        location_id: LOCATION.to_string(),
        transportation_type: TransportationType::Train,
        transportation_from: "Shibuya".to_string(),
        transportation_to: "Shinjuku".to_string(),
        cost_amount: 200,
        round_trip: true,
        remarks: String::new(),
    }
}

pub fn system_ctx() -> OperationContext {
    OperationContext::new(Requester::system("lesson-consumer"), now())
}

pub fn staff_ctx(staff_id: &str) -> OperationContext {
    OperationContext::new(Requester::new(staff_id, vec![Role::Teacher]), now())
}

pub fn admin_ctx() -> OperationContext {
    OperationContext::new(Requester::new("admin-1", vec![Role::SchoolAdmin]), now())
}

/// Every port wired to shared in-memory state
pub struct Harness {
    pub store: MockTimesheetStore,
    pub confirmation: MockConfirmationWindow,
    pub lessons: MockLessonRepository,
    pub settings: MockAutoCreateSettings,
    pub staff_expenses: MockStaffExpenseRepository,
    pub publisher: RecordingPublisher,
}

impl Harness {
    pub fn new(timesheets: Vec<Timesheet>) -> Self {
        Self {
            store: MockTimesheetStore::new(timesheets),
            confirmation: MockConfirmationWindow::new(),
            lessons: MockLessonRepository::default(),
            settings: MockAutoCreateSettings::default(),
            staff_expenses: MockStaffExpenseRepository::default(),
            publisher: RecordingPublisher::new(),
        }
    }

    pub fn with_confirmation(mut self, confirmation: MockConfirmationWindow) -> Self {
        self.confirmation = confirmation;
        self
    }

    pub fn with_lessons(mut self, lessons: Vec<Lesson>) -> Self {
        self.lessons = MockLessonRepository::new(lessons);
        self
    }

    pub fn with_settings(mut self, settings: MockAutoCreateSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_staff_expenses(mut self, defaults: Vec<StaffTransportationExpense>) -> Self {
        self.staff_expenses = MockStaffExpenseRepository::new(defaults);
        self
    }

    pub fn reconciler(&self) -> LessonEventReconciler {
        let store = Arc::new(self.store.clone());
        let builder = TimesheetBuilder::new(
            store.clone(),
            Arc::new(self.settings.clone()),
            Arc::new(self.settings.clone()),
        );
        LessonEventReconciler::new(
            store.clone(),
            store,
            Arc::new(self.confirmation.clone()),
            Arc::new(self.staff_expenses.clone()),
            builder,
            Arc::new(self.publisher.clone()),
        )
    }

    pub fn state_machine(&self) -> TimesheetStateMachine {
        let store = Arc::new(self.store.clone());
        let publisher = Arc::new(self.publisher.clone());
        TimesheetStateMachine::new(
            store.clone(),
            store,
            Arc::new(self.lessons.clone()),
            Arc::new(self.confirmation.clone()),
            publisher.clone(),
            publisher,
        )
    }

    pub fn service(&self) -> TimesheetService {
        let store = Arc::new(self.store.clone());
        TimesheetService::new(
            store.clone(),
            store,
            Arc::new(self.confirmation.clone()),
            Arc::new(self.publisher.clone()),
        )
    }
}
