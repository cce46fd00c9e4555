/**************************************************************************/
/*  This file is part of POPCON.                                          */
/*                                                                        */
/*  Copyright (C) 2025                                                    */
/*    CEA (Commissariat à l'énergie atomique et aux énergies              */
/*         alternatives)                                                  */
/*                                                                        */
/*  you can redistribute it and/or modify it under the terms of the GNU   */
/*  Lesser General Public License as published by the Free Software       */
/*  Foundation, version 2.1.                                              */
/*                                                                        */
/*  It is distributed in the hope that it will be useful,                 */
/*  but WITHOUT ANY WARRANTY; without even the implied warranty of        */
/*  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the         */
/*  GNU Lesser General Public License for more details.                   */
/*                                                                        */
/*  See the GNU Lesser General Public License version 2.1                 */
/*  for more details (enclosed in the file licenses/LGPLv2.1).            */
/*                                                                        */
/**************************************************************************/

use anyhow::Context;
use dep2gcnf::gmus;
use std::path::PathBuf;
use structopt::StructOpt;

#[derive(Debug, StructOpt)]
#[structopt(
    name = "gmus2ind",
    about = "Converts the result of a group MUS extractor on a dep2gcnf output to a `c ind` line"
)]
struct Opt {
    /// Output of the extractor
    #[structopt(parse(from_os_str))]
    input: PathBuf,

    /// Output file, stdout if absent
    #[structopt(parse(from_os_str))]
    output: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    let opts = Opt::from_args();
    let input = std::fs::read(&opts.input).context("reading input")?;
    let ids = gmus::parse_extractor_output(&input).context("failed to parse input")?;
    match opts.output {
        Some(path) => {
            let out = std::fs::File::create(&path).context("failed to open ouput for writing")?;
            gmus::write_ind_directive(out, &ids).context("writing to output")?;
        }
        None => gmus::write_ind_directive(std::io::stdout(), &ids).context("writing to stdout")?,
    }
    Ok(())
}
