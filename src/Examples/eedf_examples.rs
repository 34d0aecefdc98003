use crate::Kernels::kernel_api::{KernelError, ReactionKernel, build_kernels, kernels_table};
use crate::Kernels::kernel_config::{KernelConfig, VariableRegistry};
use crate::Kernels::material_fields::{FieldKey, FieldLayout};
use crate::Kernels::qp_data::{CoupledValues, QpContext, QpState, VarId};
use crate::Utils::analytic_rates::{ArrheniusRate, ConstantRate, MaterialProvider};
use crate::Utils::load_from_file::LoadData;
use crate::Utils::local_element::{LocalElement, element_residuals, local_jacobian};
use prettytable::{Cell, Row, Table};
use serde_json::json;

const ARGON_DECK: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/demos/argon_kernels.txt");
const M_AR: f64 = 6.63e-26; // kg
const T_GAS: f64 = 300.0; // K

/// Arrhenius-like fits of argon rate coefficients, m^3/s, mean energy in eV
fn argon_provider(layout: &mut FieldLayout, electrons: VarId, mean_en: VarId) -> MaterialProvider {
    let mut provider = MaterialProvider::new(electrons, mean_en);
    provider
        .add_rate(layout, "elastic", "", ArrheniusRate::new(2.3e-13, 0.5))
        .add_rate(layout, "excitation", "1", ArrheniusRate::new(2.5e-15, 11.5))
        .add_rate(layout, "ionization", "2", ArrheniusRate::new(2.34e-14, 15.76))
        .add_constant(layout, FieldKey::mass("Ar"), M_AR)
        .add_constant(layout, FieldKey::temperature("Ar"), T_GAS)
        .add_constant(layout, FieldKey::ElementaryCharge, 1.602e-19)
        .add_constant(layout, FieldKey::Boltzmann, 1.38e-23);
    provider
}

pub fn eedf_examples(task: usize) -> Result<(), KernelError> {
    match task {
        0 => {
            // kernels from code, one point
            let variables = VariableRegistry::new(&["em", "mean_en", "Ar"]);
            let mut layout = FieldLayout::new();
            let provider = argon_provider(&mut layout, VarId(0), VarId(1));
            let configs = vec![
                json!({"type": "EEDFElastic", "variable": "mean_en", "electrons": "em",
                       "target": "Ar", "reaction": "elastic", "use_temp_diff": true}),
                json!({"type": "EEDFEnergy", "variable": "mean_en", "electrons": "em",
                       "target": "Ar", "reaction": "ionization", "number": "2",
                       "threshold_energy": -15.76}),
                json!({"type": "EEDFReaction", "variable": "em", "mean_energy": "mean_en",
                       "electrons": "em", "target": "Ar", "reaction": "ionization",
                       "number": "2", "coefficient": 1.0}),
            ]
            .into_iter()
            .map(KernelConfig::from_json)
            .collect::<Result<Vec<_>, _>>()?;
            let kernels = build_kernels(&configs, &variables, &layout)?;
            kernels_table(&kernels, &variables).printstd();

            // n_e = 1e16 m^-3, mean energy 4 eV, 1 Torr of argon
            let vars = CoupledValues::from_vec(vec![1e16, 4e16, 3.2e22]);
            let fields = provider.values_at(&layout, &vars);
            let mut table = Table::new();
            table.add_row(Row::new(vec![
                Cell::new("kernel"),
                Cell::new("R"),
                Cell::new("dR/du"),
                Cell::new("dR/d em"),
                Cell::new("dR/d mean_en"),
                Cell::new("dR/d Ar"),
            ]));
            for kernel in &kernels {
                let ctx = QpContext::jacobian(0, 0, 0, 0, kernel.variable(), 1.0, 1.0);
                let qp = QpState::new(ctx, &vars, &fields);
                let mut row = vec![
                    Cell::new(kernel.kernel_type().name()),
                    Cell::new(&format!("{:.4e}", kernel.compute_qp_residual(&qp))),
                    Cell::new(&format!("{:.4e}", kernel.compute_qp_jacobian(&qp))),
                ];
                for jvar in (0..variables.len()).map(VarId) {
                    let value = kernel.compute_qp_off_diag_jacobian(&qp, jvar);
                    row.push(Cell::new(&format!("{:.4e}", value)));
                }
                table.add_row(Row::new(row));
            }
            table.printstd();
        }
        1 => {
            // kernels from the demo deck
            let deck = LoadData::new(ARGON_DECK.to_owned()).load_deck()?;
            let kernels = deck.build()?;
            kernels_table(&kernels, &deck.variables).printstd();
            println!("material fields: {:?}", deck.layout.keys().map(|k| k.to_string()).collect::<Vec<_>>());
        }
        2 => {
            // residuals of the demo deck on a 1D mesh of linear elements
            let mut deck = LoadData::new(ARGON_DECK.to_owned()).load_deck()?;
            let electrons = deck.variables.id("em")?;
            let mean_en = deck.variables.id("mean_en")?;
            // the provider declares the same keys, handles are shared with the deck
            let provider = argon_provider(&mut deck.layout, electrons, mean_en);
            let kernels = deck.build()?;

            let n_elements = 16;
            let g = 0.5 / 3f64.sqrt();
            let basis: Vec<Vec<f64>> = [0.5 - g, 0.5 + g]
                .iter()
                .map(|x| vec![1.0 - x, *x])
                .collect();
            let h = 1.0 / n_elements as f64;
            let weights = vec![0.5 * h, 0.5 * h];
            // electron density peaks in the middle of the gap, mean energy 2..6 eV
            let node = |x: f64| {
                let shape = (std::f64::consts::PI * x).sin() + 0.05;
                let em = 1e16 * shape;
                let eps = 2.0 + 4.0 * x;
                CoupledValues::from_vec(vec![em, em * eps, 3.2e22, 1e15 * shape, 1e14])
            };
            let elements: Vec<LocalElement> = (0..n_elements)
                .map(|id| {
                    let x0 = id as f64 * h;
                    let nodal = vec![node(x0), node(x0 + h)];
                    LocalElement::from_nodal(id, &nodal, &basis, &weights, &provider, &deck.layout)
                })
                .collect();

            let residuals = element_residuals(&kernels, &elements);
            let mut table = Table::new();
            let mut header = vec![Cell::new("element")];
            header.extend(deck.variables.names().iter().map(|name| Cell::new(name)));
            table.add_row(Row::new(header));
            for (id, rows) in residuals.iter().enumerate() {
                let mut row = vec![Cell::new(&id.to_string())];
                for var in (0..deck.variables.len()).map(VarId) {
                    let norm = rows.get(&var).map(|r| r.norm()).unwrap_or(0.0);
                    row.push(Cell::new(&format!("{:.3e}", norm)));
                }
                table.add_row(Row::new(row));
            }
            table.printstd();

            let middle = &elements[n_elements / 2];
            for kernel in kernels.iter().filter(|k| k.variable() == electrons) {
                println!(
                    "local Jacobian of {} on 'em' w.r.t. 'mean_en':\n{}",
                    kernel.kernel_type().name(),
                    local_jacobian(kernel, middle, mean_en)
                );
            }
        }
        3 => {
            // background gas: target density folded into the rate coefficient
            let variables = VariableRegistry::new(&["em", "mean_en"]);
            let mut layout = FieldLayout::new();
            let mut provider = MaterialProvider::new(VarId(0), VarId(1));
            provider.add_rate(&mut layout, "attachment", "", ConstantRate(3.0e3));
            let config = KernelConfig::from_json(json!({
                "type": "EEDFReaction", "variable": "em", "mean_energy": "mean_en",
                "electrons": "em", "reaction": "attachment", "coefficient": -1.0
            }))?;
            let kernels = build_kernels(&[config], &variables, &layout)?;
            kernels_table(&kernels, &variables).printstd();
            let vars = CoupledValues::from_vec(vec![1e16, 3e16]);
            let fields = provider.values_at(&layout, &vars);
            let qp = QpState::new(QpContext::residual(0, 0, 0, VarId(0), 1.0), &vars, &fields);
            println!(
                "attachment loss, 1/(m^3 s): {:.4e}",
                kernels[0].compute_qp_residual(&qp)
            );
        }
        _ => {
            println!("no example with number {}", task);
        }
    }
    Ok(())
}
