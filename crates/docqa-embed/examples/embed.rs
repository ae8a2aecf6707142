use docqa_embed::get_default_embedder;

fn main() -> anyhow::Result<()> {
    let embedder = get_default_embedder(None)?;
    let texts = vec!["configuring multiple GPUs".to_string(), "jobs stuck in pending".to_string()];
    let embs = embedder.embed_batch(&texts)?;
    let cos: f32 = embs[0].iter().zip(&embs[1]).map(|(a, b)| a * b).sum();
    println!("id={} B={} dim={} cos={:.4}", embedder.embedder_id(), embs.len(), embedder.dim(), cos);
    Ok(())
}
