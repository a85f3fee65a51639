//! Check command implementation.
//!
//! Validates procfs access and configuration.

use herakles_process_info::{ExtractOptions, ProcessTable, ProcfsTable};

use crate::config::{validate_effective_config, Config};
use crate::startup_checks;

/// Validates system requirements and configuration.
pub fn command_check(config: &Config) -> Result<(), Box<dyn std::error::Error>> {
    println!("🔍 Herakles Process Info - System Check");
    println!("=======================================");

    let mut all_ok = true;
    let proc_root = config.proc_root();

    // Check proc root and privileges
    println!("\n📁 Checking {} ...", proc_root.display());
    match startup_checks::validate_requirements(&proc_root) {
        Ok(_) => println!("   ✅ procfs accessible"),
        Err(e) => {
            println!("   ❌ {}", e);
            all_ok = false;
        }
    }

    // Resolve this process through the same path a query takes
    println!("\n🔎 Resolving own process...");
    let table = ProcfsTable::new(&proc_root);
    let own_pid = std::process::id() as i32;
    let guard = table.read();
    match guard.find(own_pid) {
        Some(record) => {
            let snapshot =
                herakles_process_info::process::extract(&record, &ExtractOptions::default());
            println!("   ✅ PID {} resolved (uid={})", own_pid, record.uid());
            match snapshot.executable_path {
                Some(path) => println!("   ✅ Executable: {}", path),
                None => {
                    println!("   ⚠️  Executable unreadable");
                }
            }
        }
        None => {
            println!("   ❌ PID {} not found under {}", own_pid, proc_root.display());
            all_ok = false;
        }
    }
    drop(guard);

    // Check configuration
    println!("\n⚙️  Checking configuration...");
    match validate_effective_config(config) {
        Ok(_) => {
            println!("   ✅ Configuration is valid");
        }
        Err(e) => {
            println!("   ❌ Configuration invalid: {}", e);
            all_ok = false;
        }
    }

    println!("\n📋 Summary:");
    if all_ok {
        println!("   ✅ All checks passed - system is ready");
        Ok(())
    } else {
        println!("   ❌ Some checks failed - please review warnings");
        std::process::exit(1);
    }
}
