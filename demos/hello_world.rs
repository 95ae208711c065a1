use std::io::Write;

use vfs_pack::{IniReader, OpenMode, Value, Vfs};

fn main() -> anyhow::Result<()> {
    env_logger::init();

    let tmp = std::env::temp_dir().join("vfs_pack_demo");
    let data = tmp.join("Data");
    let user = tmp.join("user");
    std::fs::create_dir_all(data.join("Themes"))?;
    std::fs::create_dir_all(&user)?;
    std::fs::write(data.join("Themes/greeting.txt"), b"Hello")?;
    std::fs::write(data.join("settings.ini"), b"[demo]\nname=World\nloud=true\n")?;

    // `Vfs::new()` picks the archive-backed realization unless the crate is
    // built with the `direct-path` feature.
    let mut vfs = Vfs::archive();
    let invocation = std::env::args().next().unwrap_or_else(|| "hello_world".to_string());
    vfs.init(&invocation)?;

    // host directories mount just like .hwp / .zip packages
    vfs.mount(&data, "Data", false)?;
    vfs.set_write_dir(&user)?;

    let settings = IniReader::open(&vfs, "Data/settings.ini");
    let name = settings.value("demo/name", "nobody");
    let loud = settings.value("demo/loud", false) == Value::Bool(true);

    let greeting = String::from_utf8(vfs.read_file("Data/Themes/greeting.txt"))?;
    let mut line = format!("{greeting}, {name}!");
    if loud {
        line = line.to_uppercase();
    }
    println!("{line}");
    println!("/Data contains {:?}", vfs.list_directory("Data"));

    // writes always land in the write directory
    {
        let mut file = vfs.open_file("greeting.log");
        file.open(OpenMode::Write)?;
        writeln!(file, "{line}")?;
    }
    println!(
        "logged to {}",
        vfs.real_dir("greeting.log")
            .unwrap_or_default()
            .join("greeting.log")
            .display()
    );

    vfs.deinit();
    std::fs::remove_dir_all(&tmp)?;
    Ok(())
}
