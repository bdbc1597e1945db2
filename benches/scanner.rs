use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use std::path::Path;
use unity_style_guard::{ConformanceChecker, RuleRegistry, SourceScanner};

const BEHAVIOUR: &str = r#"
using UnityEngine;

namespace Game.Enemies
{
    public class EnemyController : MonoBehaviour, IDamageable
    {
        private const float ATTACK_RANGE = 2.5f;
        private const int MAXHEALTH = 100;

        [SerializeField] private float moveSpeed = 3f;
        private Rigidbody _body;
        protected Transform _target;
        public int Health { get; private set; }

        void Awake()
        {
            _body = GetComponent<Rigidbody>();
            Health = MAXHEALTH;
        }

        void Update() {
            var player = GameObject.Find("Player");
            if (player?.transform != null && player.tag == "Player")
            {
                float distance = Vector3.Distance(transform.position, player.transform.position);
                if (distance < ATTACK_RANGE) Attack(player, 15);
            }
        }

        public void TakeDamage(int amount)
        {
            Health -= amount;
            if (Health <= 0)
            {
                Destroy(gameObject, 0.5f);
            }
        }

        private void Attack(GameObject victim, int Damage)
        {
            victim.SendMessage("TakeDamage", Damage);
        }
    }
}
"#;

fn scan_benchmark(c: &mut Criterion) {
    let source = BEHAVIOUR.repeat(20);
    let scanner = SourceScanner::default();
    let registry = RuleRegistry::with_defaults().expect("default rules load");

    let mut group = c.benchmark_group("scanner");
    group.throughput(Throughput::Bytes(source.len() as u64));

    group.bench_function("scan", |b| b.iter(|| scanner.scan(black_box(&source)).count()));

    group.bench_function("scan_and_check", |b| {
        let checker = ConformanceChecker::new(&registry);
        b.iter(|| checker.check(scanner.scan(black_box(&source)), Path::new("EnemyController.cs")).len())
    });

    group.finish();
}

criterion_group!(benches, scan_benchmark);
criterion_main!(benches);
