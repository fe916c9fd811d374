//! Generic proficiency-level rubric
//!
//! Skill-independent description of what each proficiency level means in
//! terms of responsibility, autonomy, complexity, and knowledge and ability.
//! Sent as auxiliary context in Round 2 only; never used for validation.

use serde::Serialize;

/// Rubric entry for one proficiency level
#[derive(Debug, Clone, Copy, Serialize)]
pub struct LevelDescriptor {
    pub level: u8,
    pub responsibility: &'static [&'static str],
    pub autonomy: &'static [&'static str],
    pub complexity: &'static [&'static str],
    pub knowledge_and_ability: &'static [&'static str],
}

pub static REFERENCE_CHART: [LevelDescriptor; 6] = [
    LevelDescriptor {
        level: 1,
        responsibility: &["Work under direct supervision.", "Accountable for tasks assigned."],
        autonomy: &["Minimal discretion required. Expected to seek guidance."],
        complexity: &["Required to perform mainly routine work."],
        knowledge_and_ability: &[
            "Able to recall factual and procedural knowledge.",
            "Apply basic skills to carry out defined tasks.",
            "Identify opportunities for minor adjustments to work tasks.",
        ],
    },
    LevelDescriptor {
        level: 2,
        responsibility: &[
            "Work with some supervision.",
            "Accountable for a broader set of tasks assigned.",
        ],
        autonomy: &[
            "Use limited discretion in resolving issues or enquiries.",
            "Able to work independently without frequently looking to others for guidance.",
        ],
        complexity: &["Required to perform mainly routine work."],
        knowledge_and_ability: &[
            "Able to understand and apply factual and procedural knowledge in a field of work.",
            "Apply basic cognitive and technical skills to carry out defined tasks and solve routine problems using simple procedures and tools.",
            "Able to present ideas and improve work.",
        ],
    },
    LevelDescriptor {
        level: 3,
        responsibility: &[
            "Work under broad direction.",
            "May hold some accountability for performance of others, in addition to self.",
        ],
        autonomy: &["Use discretion in identifying and responding to issues, work with others and contribute to work performance."],
        complexity: &["Required to perform less routine, more complex work."],
        knowledge_and_ability: &[
            "Able to apply relevant procedural and conceptual knowledge, and skills to perform differentiated work activities and manage changes.",
            "Able to collaborate with others to identify value-adding opportunities.",
        ],
    },
    LevelDescriptor {
        level: 4,
        responsibility: &[
            "Work under broad direction.",
            "Hold accountability for performance of self and others.",
        ],
        autonomy: &["Exercise judgment; Adapt and influence to achieve work performance."],
        complexity: &["Required to perform less routine, more complex work."],
        knowledge_and_ability: &[
            "Able to evaluate and develop factual and conceptual knowledge within a field of work.",
            "Able to select and apply a range of cognitive and technical skills to solve non-routine, less well-defined or abstract problems.",
            "Able to manage work activities which may be unpredictable.",
            "Facilitate the implementation of innovation.",
        ],
    },
    LevelDescriptor {
        level: 5,
        responsibility: &["Accountable for achieving assigned objectives, decisions made by self and others."],
        autonomy: &["Provide leadership to achieve desired work results; Manage resources, set milestones and drive work."],
        complexity: &["Required to perform complex work."],
        knowledge_and_ability: &[
            "Able to evaluate factual and advanced conceptual knowledge within a field of work, involving critical understanding of theories and principles.",
            "Able to select and apply an advanced range of cognitive and technical skills, demonstrating mastery and innovation, to devise solutions to solve complex and unpredictable problems in a specialised field of work.",
            "Able to manage and drive complex work activities.",
        ],
    },
    LevelDescriptor {
        level: 6,
        responsibility: &["Accountable for significant area of work, strategy or overall direction."],
        autonomy: &["Empower to chart direction and practices within and outside of work (including professional field / community), to achieve / exceed work results."],
        complexity: &["Required to perform complex work."],
        knowledge_and_ability: &[
            "Able to synthesise knowledge issues in a field of work and be the interface between different fields, in order to create new forms of knowledge.",
            "Employ advanced skills, to solve critical problems and formulate new structures, and/or to redefine existing knowledge or professional practices.",
            "Demonstrate exemplary ability to innovate, and formulate ideas and structures.",
        ],
    },
];

fn push_section(out: &mut String, name: &str, lines: &[&str]) {
    out.push_str(name);
    out.push_str(":\n");
    for line in lines {
        out.push_str("  - ");
        out.push_str(line);
        out.push('\n');
    }
}

/// Render the chart as plain text for a classification request
pub fn render() -> String {
    let mut out = String::new();
    for descriptor in REFERENCE_CHART.iter() {
        out.push_str(&format!("Proficiency Level {}\n", descriptor.level));
        push_section(&mut out, "Responsibility", descriptor.responsibility);
        push_section(&mut out, "Autonomy", descriptor.autonomy);
        push_section(&mut out, "Complexity", descriptor.complexity);
        push_section(&mut out, "Knowledge and Ability", descriptor.knowledge_and_ability);
        out.push('\n');
    }
    out
}
