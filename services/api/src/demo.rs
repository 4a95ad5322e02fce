use crate::infra::{build_application_service, MemoryApplicationService};
use clap::Args;
use incentive_desk::config::AppConfig;
use incentive_desk::error::AppError;
use incentive_desk::workflows::incentive::applications::{
    ApplicantDetails, ApplicationId, ApplicationSubmission, Attachment, AttachmentData,
};
use std::path::PathBuf;

/// 1x1 PNG used as the demo product photo.
const DEMO_PHOTO: &str = "data:image/png;base64,iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAQAAAC1HAwCAAAAC0lEQVR42mNkYAAAAAYAAjCB0C8AAAAASUVORK5CYII=";

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Write the incentive workbook to this path
    #[arg(long)]
    pub(crate) output: Option<PathBuf>,
    /// Include pending and rejected applications in the workbook
    #[arg(long)]
    pub(crate) include_unapproved: bool,
}

pub(crate) async fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let config = AppConfig::load()?;
    let service = build_application_service(&config)?;

    println!("Incentive desk demo");
    println!(
        "Per-submission incentive: {}",
        config.program.incentive_amount
    );

    println!("\nIntake");
    let mut incomplete = demo_submission("Hanbit Agency", "Yoon", "Emart Seongsu", "Kookmin");
    incomplete.details.account_number.clear();
    match service.submit(incomplete) {
        Ok(_) => println!("  Incomplete submission unexpectedly accepted"),
        Err(err) => println!("  Incomplete submission rejected: {}", err),
    }

    let ids = seed_submissions(&service)?;

    println!("\nReview");
    let decisions = ["approved", "approved", "rejected"];
    for (id, decision) in ids.iter().zip(decisions) {
        let reviewed = service.transition(id, decision)?;
        println!(
            "  {} ({}) -> {}",
            reviewed.employee_name,
            reviewed.agency_name,
            reviewed.status.label()
        );
    }
    if ids.len() > decisions.len() {
        println!("  {} application(s) left pending", ids.len() - decisions.len());
    }

    let stats = service.stats()?;
    println!("\nStatistics");
    println!(
        "  Total: {} | Pending: {} | Approved: {} | Rejected: {}",
        stats.total, stats.pending, stats.approved, stats.rejected
    );
    println!("  Approved payout: {}", stats.total_incentive);
    println!("  Participation (excluding rejected):");
    for (agency, count) in &stats.agency_participation {
        println!("    {}: {}", agency, count);
    }

    let summaries = service.agency_summaries()?;
    println!("\nAgency payouts");
    if summaries.is_empty() {
        println!("  none approved yet");
    }
    for summary in &summaries {
        println!(
            "  {}: {} approved, {} to {} {}",
            summary.agency_name,
            summary.participation_count,
            summary.total_amount,
            summary.bank_name,
            summary.account_number
        );
    }

    println!("\nKnown stores");
    for store in service.stores()? {
        println!("  {} ({})", store.name, store.address);
    }

    if let Some(path) = args.output {
        let report = service.export_report(!args.include_unapproved).await?;
        tokio::fs::write(&path, &report.bytes).await?;
        println!(
            "\nWorkbook written to {} ({} rows, {} photos embedded)",
            path.display(),
            report.rows,
            report.embedded_images
        );
    }

    Ok(())
}

fn seed_submissions(service: &MemoryApplicationService) -> Result<Vec<ApplicationId>, AppError> {
    let submissions = [
        demo_submission("Hanbit Agency", "Yoon", "Emart Seongsu", "Kookmin"),
        demo_submission("Hanbit Agency", "Jang", "Homeplus Gangseo", "Shinhan"),
        demo_submission("Saebyeok Agency", "Han", "Lotte Mart Busan", "Woori"),
        demo_submission("Saebyeok Agency", "Seo", "Daily Mart Mapo", "Hana"),
    ];

    let mut ids = Vec::with_capacity(submissions.len());
    for submission in submissions {
        let receipt = service.submit(submission)?;
        for warning in &receipt.warnings {
            println!("  Warning: {}", warning);
        }
        println!(
            "  Accepted {} from {} at {}",
            receipt.application.id,
            receipt.application.employee_name,
            receipt.application.store_name
        );
        ids.push(receipt.application.id);
    }
    Ok(ids)
}

fn demo_submission(
    agency: &str,
    employee: &str,
    store: &str,
    bank: &str,
) -> ApplicationSubmission {
    ApplicationSubmission {
        details: ApplicantDetails {
            agency_name: agency.to_string(),
            manager_name: "Kang".to_string(),
            employee_name: employee.to_string(),
            store_name: store.to_string(),
            store_address: format!("{store} front counter"),
            bank_name: bank.to_string(),
            account_number: format!("{}-{}", bank.to_ascii_uppercase(), employee.len()),
        },
        product_photos: vec![Attachment {
            name: "display.png".to_string(),
            content_type: "image/png".to_string(),
            data: Some(AttachmentData::Inline(DEMO_PHOTO.to_string())),
        }],
        store_signboard: Vec::new(),
        transaction_docs: Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn demo_submissions_pass_validation() {
        let submission = demo_submission("Hanbit Agency", "Yoon", "Emart Seongsu", "Kookmin");
        assert!(submission.details.validate().is_ok());
        assert_eq!(submission.details.account_number, "KOOKMIN-4");
    }

    #[tokio::test]
    async fn demo_photo_resolves_to_an_image() {
        let resolver = incentive_desk::workflows::incentive::ImageResolver::new(
            std::time::Duration::from_secs(1),
        )
        .expect("client builds");
        let photo = AttachmentData::Inline(DEMO_PHOTO.to_string());
        let resolved = resolver.resolve(&photo).await.expect("photo decodes");
        assert_eq!((resolved.width, resolved.height), (1, 1));
    }
}
