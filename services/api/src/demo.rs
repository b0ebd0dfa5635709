use crate::infra::{seed_demo_campus, DemoCampus, Services};
use campus_admin::access::Actor;
use campus_admin::config::NotificationConfig;
use campus_admin::error::AppError;
use campus_admin::workflows::catalog::Subject;
use campus_admin::workflows::enrollment::{
    CancelInput, EnrollmentQuery, EnrollmentRequest, EnrollmentStatus, NewEnrollmentRequest,
};
use chrono::{Datelike, Utc};
use clap::Args;

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Academic year the demo requests target. Defaults to the current year.
    #[arg(long)]
    pub(crate) academic_year: Option<i32>,
    /// Semester the demo requests target (1 or 2).
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u8).range(1..=2))]
    pub(crate) semester: u8,
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let academic_year = args.academic_year.unwrap_or_else(|| Utc::now().year());
    let semester = args.semester;

    println!("Campus enrollment demo");
    let services = Services::in_memory(&NotificationConfig::default());
    let campus = seed_demo_campus(&services.catalog)?;
    print_campus(&campus);

    let [(camila, _), (diego, _)] = &campus.students;
    let [calculus, programming, writing] = &campus.subjects;

    println!("\nStudents file requests for term {academic_year}-{semester}");
    let submit = |actor: &Actor, subject: &Subject| -> Result<EnrollmentRequest, AppError> {
        let request = services.enrollment.submit(
            actor,
            NewEnrollmentRequest {
                subject_id: subject.id.clone(),
                career_id: None,
                cycle_id: None,
                academic_year,
                semester,
                student_notes: None,
            },
        )?;
        println!(
            "- {} requested {} {} -> {} ({})",
            actor.user_id, subject.code, subject.name, request.status, request.id
        );
        Ok(request)
    };
    let camila_calculus = submit(camila, calculus)?;
    let camila_programming = submit(camila, programming)?;
    let diego_calculus = submit(diego, calculus)?;
    let diego_writing = submit(diego, writing)?;

    if let Err(err) = services.enrollment.submit(
        camila,
        NewEnrollmentRequest {
            subject_id: calculus.id.clone(),
            career_id: None,
            cycle_id: None,
            academic_year,
            semester,
            student_notes: None,
        },
    ) {
        println!("- Duplicate request refused: {err}");
    }

    println!("\nRegistrar reviews pending requests");
    let admin = &campus.admin;
    let decided = [
        services.enrollment.approve(
            admin,
            &camila_calculus.id,
            Some("Seat confirmed in morning section".to_string()),
        )?,
        services.enrollment.reject(
            admin,
            &camila_programming.id,
            Some("Section full; try next term".to_string()),
        )?,
        services.enrollment.approve(admin, &diego_calculus.id, None)?,
    ];
    for request in &decided {
        println!("- {} -> {}", request.id, request.status);
    }

    println!("\nDiego withdraws a pending request");
    let cancelled = services.enrollment.cancel(
        diego,
        &diego_writing.id,
        CancelInput {
            student_notes: Some("Schedule clash".to_string()),
        },
    )?;
    println!("- {} -> {}", cancelled.id, cancelled.status);

    if let Err(err) = services
        .enrollment
        .cancel(camila, &camila_calculus.id, CancelInput::default())
    {
        println!("- Cancelling an approved request is refused: {err}");
    }
    if let Err(err) = services.enrollment.reject(admin, &camila_calculus.id, None) {
        println!("- Reviewing a decided request is refused: {err}");
    }

    println!("\nInboxes");
    for actor in [camila, diego] {
        let inbox = services.notifications.list(actor, false, None)?;
        let unread = services.notifications.unread_count(actor)?;
        println!("- {} ({} unread)", actor.user_id, unread);
        for notification in &inbox {
            println!("  [{}] {}", notification.kind.label(), notification.message);
        }
        let cleared = services.notifications.mark_all_read(actor)?;
        println!("  marked {cleared} as read");
    }

    println!("\nEnrollment summary");
    for (actor, student) in &campus.students {
        let enrolled = services.enrollment.enrolled_subjects(admin, &student.id)?;
        println!(
            "- {} ({}) enrolled in {} subject(s)",
            student.full_name,
            actor.user_id,
            enrolled.len()
        );
    }
    for status in [
        EnrollmentStatus::Pending,
        EnrollmentStatus::Approved,
        EnrollmentStatus::Rejected,
        EnrollmentStatus::Cancelled,
    ] {
        let count = services
            .enrollment
            .list(
                admin,
                EnrollmentQuery {
                    status: Some(status),
                    ..EnrollmentQuery::default()
                },
            )?
            .len();
        println!("  {status}: {count}");
    }

    Ok(())
}

fn print_campus(campus: &DemoCampus) {
    println!(
        "- Institution {} ({}) administered by {}",
        campus.institution.name, campus.institution.slug, campus.admin.user_id
    );
    for subject in &campus.subjects {
        println!(
            "  subject {} {} ({} credits)",
            subject.code, subject.name, subject.credits
        );
    }
    for (_, student) in &campus.students {
        println!(
            "  student {} {} <{}>",
            student.student_code, student.full_name, student.email
        );
    }
}
