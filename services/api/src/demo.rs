use crate::error::AppError;
use crate::infra::{seed_sample_program, Applicants, Services};
use application_tool::applicant::{ApplicantId, ReadOnlyApplicantProgram, StageOutcome};
use application_tool::config::VersioningConfig;
use application_tool::definitions::{ProgramId, DEFAULT_LOCALE};
use clap::Args;
use std::collections::BTreeMap;

#[derive(Args, Debug)]
pub(crate) struct DemoArgs {
    /// Favorite color to answer with; "blue" reveals the pet screen.
    #[arg(long, default_value = "blue")]
    pub(crate) color: String,
    /// Household member name; repeat the flag to add more members.
    #[arg(long = "member", default_values_t = vec!["Ann".to_string(), "Bob".to_string()])]
    pub(crate) members: Vec<String>,
    /// Locale used for the program title.
    #[arg(long, default_value = DEFAULT_LOCALE)]
    pub(crate) locale: String,
}

pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        color,
        members,
        locale,
    } = args;

    let services = Services::in_memory(VersioningConfig::default());
    let program = seed_sample_program(&services.versions)?;
    let applicant = services.applicants.create_applicant()?;
    println!(
        "Application tool demo: program '{}' (id {}), applicant {}",
        program.admin_name, program.id, applicant.id
    );

    let mut answers = vec![(
        "1".to_string(),
        BTreeMap::from([("applicant.favorite_color.text".to_string(), color)]),
    )];
    answers.push((
        "2".to_string(),
        members
            .iter()
            .enumerate()
            .map(|(index, name)| {
                (format!("applicant.household_members[{index}]"), name.clone())
            })
            .collect(),
    ));
    for index in 0..members.len() {
        // Ages above 130 fail validation, so the first member's screen comes back unsaved.
        let age = if index == 0 { 140 } else { 29 + index };
        answers.push((
            format!("3-{index}"),
            BTreeMap::from([(
                format!("applicant.household_members[{index}].age.number"),
                age.to_string(),
            )]),
        ));
    }

    for (block_id, updates) in answers {
        stage(&services.applicants, applicant.id, program.id, &block_id, &updates)?;
    }

    let view = services
        .applicants
        .read_only_applicant_program(applicant.id, program.id)?;
    render_view(&view, &locale);
    Ok(())
}

fn stage(
    applicants: &Applicants,
    applicant_id: ApplicantId,
    program_id: ProgramId,
    block_id: &str,
    updates: &BTreeMap<String, String>,
) -> Result<(), AppError> {
    match applicants.stage_and_update_if_valid(applicant_id, program_id, block_id, updates)? {
        StageOutcome::Committed(view) => {
            println!(
                "- block {block_id}: saved {} answer(s), {}% complete",
                updates.len(),
                view.completion_percentage()
            );
        }
        StageOutcome::Preview(view) => {
            println!("- block {block_id}: not saved, answers need attention");
            if let Some(block) = view.get_block(block_id) {
                for question in block.questions().iter().filter(|q| q.has_errors()) {
                    for error in question.errors() {
                        println!("    {}: {error}", question.definition().name);
                    }
                }
            }
        }
    }
    Ok(())
}

fn render_view(view: &ReadOnlyApplicantProgram, locale: &str) {
    println!("\n{} ({}% complete)", view.program_title(locale), view.completion_percentage());
    match view.get_first_incomplete_block() {
        Some(block) => println!("Next screen: {} ({})", block.name(), block.id()),
        None => println!("All required screens are complete"),
    }
    println!("Active screens:");
    for block in view.get_all_active_blocks() {
        let marker = if block.is_complete() { "x" } else { " " };
        let optional = if view.is_block_optional(block.id()) {
            " [optional]"
        } else {
            ""
        };
        println!("  [{marker}] {} {}{optional}", block.id(), block.name());
    }
    println!("Answers:");
    for answer in view.get_summary_data() {
        println!(
            "  - {} => {}",
            answer.question_text, answer.answer_text
        );
    }
}
