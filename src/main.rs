use levelwalk::config::SceneConfig;

fn main() -> anyhow::Result<()> {
    levelwalk::flow::run(SceneConfig::from_env())
}
