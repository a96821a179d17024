mod scenarios;
mod test_ctx;

use zygote_protect::set_debug;

fn main() {
    set_debug(true);
    scenarios::run_all();
    println!("protect_test all scenarios passed");
}
