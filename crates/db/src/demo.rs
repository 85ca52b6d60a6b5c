//! Demo school dataset.
//!
//! A French-curriculum school from PS to Terminale with one record set per
//! planning module. Loaded into the memory store on startup when
//! `storage.seed_demo` is set, and into Postgres by the seeder.

use rust_decimal_macros::dec;

use schoolplan_core::planning::{PeriodAmounts, PlanningModule, PlanningRecord};
use schoolplan_core::projection::{BaseEnrollment, Cycle, GradeCatalog, GradeLevel};
use schoolplan_core::version::{CreateVersionInput, ScenarioType};
use schoolplan_shared::types::{CycleId, LevelId};

/// Everything needed to populate one budget version.
#[derive(Debug, Clone)]
pub struct DemoDataset {
    /// Version to create.
    pub version: CreateVersionInput,
    /// Cycles and grades.
    pub catalog: GradeCatalog,
    /// Current headcount per grade.
    pub base_enrollment: Vec<BaseEnrollment>,
    /// Committed records, one entry per module.
    pub records: Vec<(PlanningModule, Vec<PlanningRecord>)>,
}

const CYCLES: [(&str, &str, &[(&str, &str, u32)]); 4] = [
    (
        "MAT",
        "Maternelle",
        &[("PS", "Petite section", 42), ("MS", "Moyenne section", 48), ("GS", "Grande section", 50)],
    ),
    (
        "ELEM",
        "Élémentaire",
        &[
            ("CP", "Cours préparatoire", 52),
            ("CE1", "Cours élémentaire 1", 55),
            ("CE2", "Cours élémentaire 2", 51),
            ("CM1", "Cours moyen 1", 49),
            ("CM2", "Cours moyen 2", 47),
        ],
    ),
    (
        "COLL",
        "Collège",
        &[
            ("6EME", "Sixième", 58),
            ("5EME", "Cinquième", 54),
            ("4EME", "Quatrième", 50),
            ("3EME", "Troisième", 46),
        ],
    ),
    (
        "LYC",
        "Lycée",
        &[("2NDE", "Seconde", 44), ("1ERE", "Première", 40), ("TERM", "Terminale", 38)],
    ),
];

fn catalog() -> (GradeCatalog, Vec<BaseEnrollment>) {
    let mut catalog = GradeCatalog::default();
    let mut base = Vec::new();
    let mut level_order = 0;
    for (cycle_order, (code, name, grades)) in (1..).zip(CYCLES) {
        let cycle_id = CycleId::new();
        catalog.cycles.push(Cycle {
            id: cycle_id,
            code: code.to_string(),
            name: name.to_string(),
            sort_order: cycle_order,
        });
        for (grade_code, grade_name, headcount) in grades {
            level_order += 1;
            let level_id = LevelId::new();
            catalog.levels.push(GradeLevel {
                id: level_id,
                code: (*grade_code).to_string(),
                name: (*grade_name).to_string(),
                cycle_id: Some(cycle_id),
                sort_order: level_order,
            });
            base.push(BaseEnrollment {
                level_id,
                student_count: *headcount,
            });
        }
    }
    (catalog, base)
}

fn records() -> Vec<(PlanningModule, Vec<PlanningRecord>)> {
    vec![
        (
            PlanningModule::Enrollment,
            vec![
                PlanningRecord::operational("Maternelle headcount"),
                PlanningRecord::operational("Élémentaire headcount"),
                PlanningRecord::operational("Secondaire headcount"),
            ],
        ),
        (
            PlanningModule::ClassStructure,
            vec![PlanningRecord::operational("Divisions per grade")],
        ),
        (
            PlanningModule::Dhg,
            vec![
                PlanningRecord::financial("64110", "Salaires enseignants", dec!(4_200_000)),
                PlanningRecord::financial("64120", "Salaires administratifs", dec!(900_000)),
                PlanningRecord::financial("64500", "Charges sociales", dec!(610_000)),
            ],
        ),
        (
            PlanningModule::Revenue,
            vec![
                PlanningRecord::financial("70610", "Frais de scolarité", dec!(7_800_000))
                    .with_periods(PeriodAmounts {
                        t1: dec!(3_120_000),
                        t2: dec!(2_340_000),
                        t3: dec!(2_340_000),
                    }),
                PlanningRecord::financial("70620", "Droits d'inscription", dec!(420_000)),
                PlanningRecord::financial("74000", "Subventions", dec!(250_000)),
            ],
        ),
        (
            PlanningModule::Costs,
            vec![
                PlanningRecord::financial("60610", "Fournitures pédagogiques", dec!(180_000)),
                PlanningRecord::financial("61320", "Loyers", dec!(960_000)),
                PlanningRecord::financial("62600", "Télécommunications", dec!(45_000)),
                PlanningRecord::financial("61520", "Entretien des bâtiments", dec!(130_000)),
            ],
        ),
        (
            PlanningModule::Capex,
            vec![
                PlanningRecord::financial("21830", "Matériel informatique", dec!(240_000))
                    .with_useful_life(4),
                PlanningRecord::financial("21840", "Mobilier scolaire", dec!(150_000))
                    .with_useful_life(10),
            ],
        ),
    ]
}

/// Builds the demo dataset with fresh catalogue ids.
#[must_use]
pub fn demo_dataset() -> DemoDataset {
    let (catalog, base_enrollment) = catalog();
    DemoDataset {
        version: CreateVersionInput {
            name: "Budget 2026".to_string(),
            fiscal_year: 2026,
            academic_year: "2025-2026".to_string(),
            scenario_type: ScenarioType::Budget,
            notes: Some("Demo school".to_string()),
        },
        catalog,
        base_enrollment,
        records: records(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_module_has_records() {
        let data = demo_dataset();
        for module in PlanningModule::ALL {
            assert!(
                data.records
                    .iter()
                    .any(|(m, records)| *m == module && !records.is_empty()),
                "{module} has no demo records"
            );
        }
    }

    #[test]
    fn test_every_grade_has_a_cycle_and_headcount() {
        let data = demo_dataset();
        assert_eq!(data.catalog.cycles.len(), 4);
        assert_eq!(data.catalog.levels.len(), 15);
        assert_eq!(data.base_enrollment.len(), data.catalog.levels.len());
        for level in &data.catalog.levels {
            let cycle = level.cycle_id.unwrap();
            assert!(data.catalog.has_cycle(cycle));
        }
    }

    #[test]
    fn test_breakdowns_sum_to_amount() {
        for (_, records) in demo_dataset().records {
            for record in records {
                if let Some(p) = record.period_amounts {
                    assert_eq!(p.total(), record.amount_sar, "{}", record.account_name);
                }
            }
        }
    }
}
