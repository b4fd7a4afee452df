use criterion::{criterion_group, criterion_main, Criterion};
use stiffsol::{
    ode_equations::test_models::{
        exponential_decay::exponential_decay_problem, robertson::robertson,
    },
    OdeSolverMethod, LU,
};

fn criterion_benchmark(c: &mut Criterion) {
    macro_rules! bench {
        ($name:ident, $solver:ident, $model_problem:ident) => {
            c.bench_function(stringify!($name), |b| {
                b.iter(|| {
                    let (problem, soln) = $model_problem::<f64>();
                    let t_eval = soln
                        .solution_points
                        .iter()
                        .map(|p| p.t)
                        .collect::<Vec<_>>();
                    let mut solver = problem.$solver::<LU<f64>>().unwrap();
                    solver.solve_dense(&t_eval).unwrap()
                })
            });
        };
    }

    bench!(
        nalgebra_tr_bdf2_exponential_decay,
        tr_bdf2,
        exponential_decay_problem
    );
    bench!(
        nalgebra_esdirk34_exponential_decay,
        esdirk34,
        exponential_decay_problem
    );
    bench!(
        nalgebra_kvaerno5_exponential_decay,
        kvaerno5,
        exponential_decay_problem
    );
    bench!(nalgebra_tr_bdf2_robertson, tr_bdf2, robertson);
    bench!(nalgebra_esdirk34_robertson, esdirk34, robertson);
    bench!(nalgebra_kvaerno5_robertson, kvaerno5, robertson);
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
