use criterion::{black_box, criterion_group, criterion_main, Criterion};
use parley_checkpoint::{
    Checkpoint, CheckpointConfig, CheckpointMetadata, CheckpointSaver, InMemoryCheckpointSaver,
};
use serde_json::json;

fn conversation_values(turns: usize) -> serde_json::Value {
    let messages: Vec<_> = (0..turns)
        .map(|i| json!({"type": "human", "id": i.to_string(), "content": "dame el SLA"}))
        .collect();
    json!({"messages": messages, "selected_entities": ["A", "B"], "guidance": ""})
}

fn head_write_benchmark(c: &mut Criterion) {
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let values = conversation_values(50);

    c.bench_function("put head (50 messages)", |b| {
        b.to_async(&runtime).iter(|| async {
            let saver = InMemoryCheckpointSaver::new();
            let config = CheckpointConfig::for_thread("bench-thread");
            saver
                .put(
                    &config,
                    black_box(Checkpoint::new(values.clone(), 0)),
                    CheckpointMetadata::new(),
                )
                .await
                .unwrap();
        });
    });
}

fn locked_turn_benchmark(c: &mut Criterion) {
    let runtime = tokio::runtime::Runtime::new().unwrap();
    let saver = InMemoryCheckpointSaver::new().with_max_history(16);
    let values = conversation_values(10);

    c.bench_function("lock + read + write", |b| {
        b.to_async(&runtime).iter(|| async {
            let config = CheckpointConfig::for_thread("bench-thread");
            let _guard = saver.lock_thread("bench-thread").await;
            let _ = saver.get_tuple(black_box(&config)).await.unwrap();
            saver
                .put(&config, Checkpoint::new(values.clone(), 1), CheckpointMetadata::new())
                .await
                .unwrap();
        });
    });
}

criterion_group!(benches, head_write_benchmark, locked_turn_benchmark);
criterion_main!(benches);
